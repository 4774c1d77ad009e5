//! Health and readiness endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use nutri_common::ReadinessState;
use serde::Serialize;

use crate::pipeline::IngestReport;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("nutri-ingest")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "nutri-ingest".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub state: ReadinessState,
    pub basic_ready: bool,
    pub full_ready: bool,
    /// Most recent completed ingestion run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<IngestReport>,
}

/// GET /readiness
pub async fn readiness(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let current = state.provider.readiness().current();

    Json(ReadinessResponse {
        state: current,
        basic_ready: current.basic_ready(),
        full_ready: current.full_ready(),
        last_run: state.provider.last_report().await,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/readiness", get(readiness))
}
