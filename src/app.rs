use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Response, StatusCode, header},
    response::Html,
    routing::{delete, get, post},
};
use std::any::Any;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::blobs::BlobRegistry;
use crate::config::Config;
use crate::error::{ApiError, lock};
use crate::session::SessionStore;
use crate::store::TodoStore;
use crate::ui::{self, TodoListView};
use crate::{file_api, todo_api};

/// State shared by every request
pub struct AppState {
    pub store: Mutex<TodoStore>,
    pub sessions: Mutex<SessionStore>,
    pub blobs: BlobRegistry,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            store: Mutex::new(TodoStore::new()),
            sessions: Mutex::new(SessionStore::new(config.session_ttl)),
            blobs: BlobRegistry::new(),
            config,
        }
    }
}

/// Build the application router
///
/// Kept separate from [`run`] so tests can drive it without a socket.
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let body_limit = state.config.max_upload_bytes;

    let routes = Router::new()
        .route("/", get(serve_index))
        .route("/health", get(health))
        .route("/todos", get(todo_api::list_todos).post(todo_api::create_todo))
        .route(
            "/todos/:id",
            get(todo_api::get_todo)
                .put(todo_api::update_todo)
                .delete(todo_api::delete_todo),
        )
        .route(
            "/resources",
            get(file_api::list_resources).post(file_api::upload_resources),
        )
        .route("/resources/:id", delete(file_api::delete_resource))
        .route("/resources/:id/download", get(file_api::download_resource))
        .route("/resources/:id/raw", get(file_api::open_resource))
        .route("/preview", delete(file_api::close_preview))
        .route("/preview/:id", post(file_api::open_preview))
        .route("/blobs/:token", get(file_api::serve_blob))
        .nest_service("/static", ServeDir::new(static_dir));

    with_middleware(routes, body_limit).with_state(state)
}

// Tracing, panic recovery, CORS and the upload size limit, outermost first.
fn with_middleware<S>(routes: Router<S>, body_limit: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::max(body_limit)),
    )
}

/// Bind to the configured address and serve until the process stops
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.addr.clone();
    let state = Arc::new(AppState::new(config));
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let todos = lock(&state.store, "Failed to fetch todos")?.list().to_vec();

    let mut view = TodoListView::new();
    view.finish_loading(todos);
    Ok(Html(ui::render_page(&view)))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "ok" }))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    log::error!("Handler panicked: {}", detail);

    let body = serde_json::json!({ "error": "Internal server error" }).to_string();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    #[test]
    fn panics_become_json_500() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[tokio::test]
    async fn panicking_route_answers_json_500() {
        let app = with_middleware(Router::new().route("/explode", get(explode)), 1024);

        let request = Request::builder().uri("/explode").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Internal server error" }));
    }

    #[test]
    fn state_starts_empty() {
        let state = AppState::new(Config::default());
        assert!(state.store.lock().unwrap().is_empty());
        assert!(state.sessions.lock().unwrap().is_empty());
        assert!(state.blobs.is_empty());
    }
}
