mod error;
pub mod handlers;

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, HLS_URL_PREFIX};
use crate::db::VideoRepository;
use crate::job::{JobOrchestrator, ProgressStore};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub progress: ProgressStore,
    pub videos: VideoRepository,
}

impl AppState {
    pub fn new(config: Arc<Config>, videos: VideoRepository) -> Self {
        let progress = ProgressStore::new();
        let orchestrator = Arc::new(JobOrchestrator::new(config.clone(), progress.clone()));

        Self {
            config,
            orchestrator,
            progress,
            videos,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let hls = ServeDir::new(&state.config.hls_dir);

    let router = Router::new()
        .route("/api/upload", post(handlers::upload))
        .route("/api/videos", get(handlers::list_videos))
        .route("/api/videos/:id", delete(handlers::delete_video))
        .route("/progress/:id", get(handlers::progress))
        .nest_service(HLS_URL_PREFIX, hls)
        .layer(DefaultBodyLimit::disable())
        .with_state(state);

    with_request_layers(router)
}

/// Per-request logging, and a 500 instead of a dropped connection when a
/// handler panics.
fn with_request_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.http_host, state.config.http_port);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
