//! HTTP boundary of the trailmap engine.

pub mod dto;
pub mod error;
pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use trailmap::SessionHandle;

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
}

impl AppState {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/batch", post(handlers::ingest_batch))
        .route("/api/ping", post(handlers::ingest_ping))
        .route("/api/map-data", get(handlers::map_data))
        .route("/api/stats", get(handlers::stats))
        .route("/api/reset", post(handlers::reset))
        .route("/healthz", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
