use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use scribe::history::HistoryStore;
use scribe::process::OcrOrchestrator;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tower_http::limit::RequestBodyLimitLayer;

mod handlers;

/// Uploads arrive base64 encoded, so this is roughly 18 MiB of image.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            message: Some(message.into()),
        }
    }
}

pub struct AppState {
    pub orchestrator: Arc<OcrOrchestrator>,
    pub history: Mutex<HistoryStore>,
}

impl AppState {
    pub fn new(orchestrator: OcrOrchestrator, history: HistoryStore) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            history: Mutex::new(history),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route("/health", get(|| async { "healthy" }))
        .route("/process-image", post(handlers::process_image))
        .route("/state", get(handlers::get_state))
        .route("/reset", post(handlers::reset))
        .route("/history", get(handlers::list_history).delete(handlers::clear_history))
        .route("/history/:id", get(handlers::get_history_item).delete(handlers::remove_history_item))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

