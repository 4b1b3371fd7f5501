//! REST handlers for todos
//!
//! Every handler locks the store for the whole operation, so each request is
//! atomic against the list.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::{ApiError, lock, parse_id};
use crate::todo::{Todo, TodoPatch};

/// Body of `POST /todos`
#[derive(Debug, Deserialize)]
pub struct CreateTodo {
    #[serde(default)]
    pub title: Option<String>,
}

/// `GET /todos`: every todo in insertion order
pub async fn list_todos(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Todo>>, ApiError> {
    let store = lock(&state.store, "Failed to fetch todos")?;
    Ok(Json(store.list().to_vec()))
}

/// `GET /todos/{id}`
pub async fn get_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&id)?;
    let store = lock(&state.store, "Failed to fetch todo")?;
    Ok(Json(store.get_by_id(id)?.clone()))
}

/// `POST /todos`: create a todo from `{title}`
///
/// # Returns
/// * `201 Created` with the new todo
///
/// # Errors
/// * `400` when the title is missing or blank, or the body is not valid JSON
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(body) = payload?;
    let title = body.title.unwrap_or_default();

    let mut store = lock(&state.store, "Failed to create todo")?;
    let todo = store.add(&title)?;
    log::info!("Created todo {}", todo.id);

    Ok((StatusCode::CREATED, Json(todo)))
}

/// `PUT /todos/{id}`: merge `{title?, completed?}` into a todo
///
/// The id is validated before the body, and both before the lookup.
///
/// # Errors
/// * `400` for an invalid id, a blank title or a malformed body
/// * `404` when no todo has that id
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TodoPatch>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&id)?;
    let Json(patch) = payload?;

    let mut store = lock(&state.store, "Failed to update todo")?;
    let todo = store.update(id, patch)?;
    log::info!("Updated todo {}", todo.id);

    Ok(Json(todo))
}

/// `DELETE /todos/{id}`
///
/// # Errors
/// * `400` for an invalid id
/// * `404` when no todo has that id
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;

    let mut store = lock(&state.store, "Failed to delete todo")?;
    store.remove(id)?;
    log::info!("Deleted todo {}", id);

    Ok(Json(serde_json::json!({ "message": "Todo deleted successfully" })))
}
