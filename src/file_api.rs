//! Handlers for the resource pool and the preview panel
//!
//! Uploaded files belong to the caller's browser session, identified by the
//! `session` cookie, and are held in server memory only. A session is created
//! by the first upload; other routes answer as if the pool were empty until
//! then.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use crate::app::AppState;
use crate::data_url::DataUrl;
use crate::error::{ApiError, lock, parse_id};
use crate::preview::{self, PdfSource, Preview};
use crate::resources::{FileResource, ResourceError, ResourceSummary};
use crate::session::{SESSION_COOKIE, Session};
use crate::ui;

/// Response of `POST /preview/{id}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub resource_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub kind: &'static str,
    pub html: String,
    pub blob_url: Option<String>,
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

// Runs `f` against the caller's session, creating one if needed, and
// refreshes the session cookie. Only uploads create sessions.
fn with_session<R>(
    state: &AppState,
    jar: CookieJar,
    message: &'static str,
    f: impl FnOnce(&mut Session) -> Result<R, ApiError>,
) -> Result<(CookieJar, R), ApiError> {
    let mut sessions = lock(&state.sessions, message)?;
    let id = sessions.touch(jar.get(SESSION_COOKIE).map(|cookie| cookie.value()));
    let session = sessions
        .get_mut(&id)
        .ok_or_else(|| ApiError::internal(message, "session disappeared"))?;

    let result = f(session)?;
    Ok((jar.add(session_cookie(id)), result))
}

// Runs `f` against the caller's session if it has a live one. Nothing is
// created; the cookie is refreshed only for a live session, whose id is
// returned alongside the result.
fn with_existing_session<R>(
    state: &AppState,
    jar: CookieJar,
    message: &'static str,
    f: impl FnOnce(Option<&mut Session>) -> Result<R, ApiError>,
) -> Result<(CookieJar, Option<String>, R), ApiError> {
    let mut sessions = lock(&state.sessions, message)?;
    let id = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string());
    let session = sessions.resume(id.as_deref());
    let live = session.is_some();

    let result = f(session)?;
    match id.filter(|_| live) {
        Some(id) => Ok((jar.add(session_cookie(id.clone())), Some(id), result)),
        None => Ok((jar, None, result)),
    }
}

/// `GET /resources`: files uploaded in this session
pub async fn list_resources(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Vec<ResourceSummary>>), ApiError> {
    let (jar, _, summaries) = with_existing_session(&state, jar, "Failed to list files", |session| {
        Ok(session
            .map(|session| session.resources.list().iter().map(ResourceSummary::from).collect::<Vec<_>>())
            .unwrap_or_default())
    })?;
    Ok((jar, Json(summaries)))
}

/// `POST /resources`: upload one or more files
///
/// Reads every multipart field named `file`. All files are checked before any
/// is stored, so a rejected upload stores nothing.
///
/// # Errors
/// * `400` when no file was sent, a file has an unsupported extension, or the
///   multipart body is malformed or too large
pub async fn upload_resources(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<(StatusCode, CookieJar, Json<Vec<ResourceSummary>>), ApiError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("unnamed").to_string();
        let mime = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if !crate::resources::extension_of(&name)
            .is_some_and(|ext| crate::resources::ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        {
            return Err(ApiError::BadRequest(format!("Unsupported file type: {}", name)));
        }
        uploads.push((name, mime, bytes));
    }

    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No file data received".to_string()));
    }

    let (jar, summaries) = with_session(&state, jar, "Failed to store files", |session| {
        let mut summaries = Vec::with_capacity(uploads.len());
        for (name, mime, bytes) in &uploads {
            let resource = session.resources.add(name, mime.as_deref(), bytes)?;
            log::info!("Uploaded {} ({} bytes)", resource.name, bytes.len());
            summaries.push(ResourceSummary::from(&resource));
        }
        Ok(summaries)
    })?;

    Ok((StatusCode::CREATED, jar, Json(summaries)))
}

/// `DELETE /resources/{id}`: remove a file, closing its preview if open
pub async fn delete_resource(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    let id = parse_id(&id)?;
    let (jar, _, _) = with_existing_session(&state, jar, "Failed to delete file", |session| {
        let session = session.ok_or(ResourceError::NotFound(id))?;
        session.resources.remove(id)?;
        session.preview.close_if_showing(id);
        Ok(())
    })?;
    Ok((jar, Json(serde_json::json!({ "message": "File deleted successfully" }))))
}

fn find_resource(
    state: &AppState,
    jar: CookieJar,
    raw_id: &str,
) -> Result<(CookieJar, FileResource), ApiError> {
    let id = parse_id(raw_id)?;
    let (jar, _, resource) = with_existing_session(state, jar, "Failed to read file", |session| {
        let session = session.ok_or(ResourceError::NotFound(id))?;
        Ok(session.resources.get(id)?.clone())
    })?;
    Ok((jar, resource))
}

// Header-safe file name for Content-Disposition.
fn disposition(kind: &str, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() || !c.is_ascii() { '_' } else { c })
        .collect();
    format!("{}; filename=\"{}\"", kind, safe)
}

fn file_response(jar: CookieJar, resource: &FileResource, kind: &str) -> Result<Response, ApiError> {
    let data = DataUrl::parse(&resource.url).map_err(|e| ApiError::internal("Failed to read file", e))?;
    let headers = [
        (header::CONTENT_TYPE, resource.mime.clone()),
        (header::CONTENT_DISPOSITION, disposition(kind, &resource.name)),
    ];
    Ok((jar, headers, Body::from(data.bytes)).into_response())
}

/// `GET /resources/{id}/download`: the file as an attachment
pub async fn download_resource(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (jar, resource) = find_resource(&state, jar, &id)?;
    file_response(jar, &resource, "attachment")
}

/// `GET /resources/{id}/raw`: the file inline, for opening in a new tab
pub async fn open_resource(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (jar, resource) = find_resource(&state, jar, &id)?;
    file_response(jar, &resource, "inline")
}

/// `POST /preview/{id}`: open the preview panel on a file
///
/// Any previous preview of this session is closed first, which revokes its
/// blob URL. Decoding and conversion run on a blocking thread; if the preview
/// was closed or replaced before they finish, the result is dropped and the
/// request answers `409`.
pub async fn open_preview(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<(CookieJar, Json<PreviewResponse>), ApiError> {
    const FAILED: &str = "Failed to preview file";

    let id = parse_id(&id)?;
    let (jar, session_id, (resource, generation)) =
        with_existing_session(&state, jar, FAILED, |session| {
            let session = session.ok_or(ResourceError::NotFound(id))?;
            let resource = session.resources.get(id)?.clone();
            let generation = session.preview.begin(id);
            Ok((resource, generation))
        })?;

    let mut rendered = {
        let resource = resource.clone();
        tokio::task::spawn_blocking(move || preview::render(&resource))
            .await
            .map_err(|e| ApiError::internal(FAILED, e))?
    };

    let superseded = || ApiError::Conflict("Preview superseded".to_string());
    let session_id = session_id.ok_or_else(superseded)?;
    let mut sessions = lock(&state.sessions, FAILED)?;
    let session = sessions.get_mut(&session_id).ok_or_else(superseded)?;
    if !session.preview.is_current(generation) {
        log::debug!("Dropping stale preview of {}", resource.name);
        return Err(superseded());
    }

    let blob_url = match &mut rendered {
        Preview::Pdf(PdfSource::Bytes(bytes)) => {
            let handle = state.blobs.register("application/pdf", std::mem::take(bytes));
            let url = handle.url();
            session.preview.attach_blob(generation, handle);
            Some(url)
        }
        Preview::Pdf(PdfSource::Url(url)) => Some(url.clone()),
        _ => None,
    };
    drop(sessions);

    let html = ui::render_preview(&resource, &rendered, blob_url.as_deref());
    let response = PreviewResponse {
        resource_id: resource.id,
        kind: resource.kind().label(),
        name: resource.name,
        mime: resource.mime,
        html,
        blob_url,
    };
    Ok((jar, Json(response)))
}

/// `DELETE /preview`: close the preview panel and revoke its blob URL
pub async fn close_preview(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    let (jar, _, closed) = with_existing_session(&state, jar, "Failed to close preview", |session| {
        Ok(session.and_then(|session| session.preview.close()))
    })?;
    Ok((jar, Json(serde_json::json!({ "closed": closed }))))
}

/// `GET /blobs/{token}`: content behind a live blob URL
pub async fn serve_blob(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let blob = state
        .blobs
        .get(&token)
        .ok_or_else(|| ApiError::NotFound("Blob not found".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, blob.content_type.clone())],
        Body::from(blob.bytes.to_vec()),
    )
        .into_response())
}
