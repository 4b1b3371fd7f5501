/*!
# Todo Web

A small todo list web application with a per-session file preview panel,
built in Rust.

## Overview

The server keeps a list of todos in memory and exposes it over a JSON REST
API. A single HTML page, rendered on the server, lists the todos and lets the
user add, toggle and delete them. Alongside the list, the page keeps a pool of
uploaded files per browser session and previews them in a modal panel.

Uploaded files are held in server memory, separately for each browser
session. They are never written to disk or sent anywhere else, and they are
lost when the session expires or the server stops.

## Architecture

### Frontend Layer
- **Technologies**: HTML, CSS, JavaScript
- **Key Components**:
  - Todo list - add, toggle, delete, with a loading state and empty placeholder
  - Resource pool - upload, list, delete uploaded files
  - Preview panel - shows one file at a time

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Todo store - ordered records with ids and timestamps
  - Session store - per-browser file pools and preview state
  - Preview renderer - images, PDFs, Word and Excel documents
  - Blob registry - short-lived URLs for PDF content

No state survives a restart.

## REST API Endpoints

- `GET /todos`, `POST /todos` - List or create todos
- `GET /todos/{id}`, `PUT /todos/{id}`, `DELETE /todos/{id}` - One todo
- `GET /health` - Liveness check
- `GET /resources`, `POST /resources` - The session's files
- `DELETE /resources/{id}` - Remove a file
- `GET /resources/{id}/download`, `GET /resources/{id}/raw` - File content
- `POST /preview/{id}`, `DELETE /preview` - Open or close the preview
- `GET /blobs/{token}` - Content behind a blob URL

## Modules

- **todo**: Todo record and update patch
- **store**: In-memory todo store
- **ui**: List view state and HTML rendering
- **resources**: Uploaded files and the per-session pool
- **preview**: File classification and preview rendering
- **converter**: Word to HTML and Excel to grid conversion
- **data_url**: Base64 data URL encoding
- **blobs**: Revocable blob URLs
- **session**: Browser sessions and preview state
- **config**: Server configuration
- **app**: Routing and middleware
*/

pub mod blobs;
pub mod config;
pub mod converter;
pub mod data_url;
pub mod preview;
pub mod resources;
pub mod session;
pub mod store;
pub mod todo;
pub mod ui;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod error;
#[cfg(feature = "web")]
pub mod file_api;
#[cfg(feature = "web")]
pub mod todo_api;

pub use config::Config;
pub use preview::{FileKind, Preview};
pub use resources::{FileResource, ResourcePool};
pub use store::{StoreError, TodoStore};
pub use todo::{Todo, TodoPatch};
