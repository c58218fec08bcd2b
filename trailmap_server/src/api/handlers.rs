//! Request handlers. Each one is a thin adapter over the `SessionHandle`.

use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use tracing::info;

use super::AppState;
use super::dto::{DecodedBatch, IngestResponse, MapDataResponse, StatsResponse};
use super::error::ApiError;

// Bodies are taken as raw bytes: axum's `Json` extractor would parse every
// number up front and refuse the whole batch over one unrepresentable value.

/// `POST /api/batch`: an ordered array of pings.
pub async fn ingest_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let batch = DecodedBatch::from_array_body(&body)?;
    if batch.samples.is_empty() && batch.rejected.is_empty() {
        return Ok(Json(IngestResponse::empty()));
    }
    ingest(state, batch).await
}

/// `POST /api/ping`: a single ping.
pub async fn ingest_ping(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    ingest(state, DecodedBatch::from_single_body(&body)?).await
}

async fn ingest(state: AppState, mut batch: DecodedBatch) -> Result<Json<IngestResponse>, ApiError> {
    let samples = std::mem::take(&mut batch.samples);
    let report = if samples.is_empty() {
        Default::default()
    } else {
        state.session.ingest(samples).await?
    };
    Ok(Json(IngestResponse::from_report(report, batch)))
}

/// `GET /api/map-data`: every visited cell and the current position.
pub async fn map_data(State(state): State<AppState>) -> Result<Json<MapDataResponse>, ApiError> {
    let projection = state.session.project().await?;
    Ok(Json(projection.into()))
}

/// `GET /api/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(state.session.stats().await?.into()))
}

/// `POST /api/reset`: wipes the map, the cursor and the history.
pub async fn reset(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.session.reset().await?;
    info!("map reset requested over http");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> &'static str {
    "ok"
}
