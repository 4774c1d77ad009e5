//! Administrative endpoints

use axum::{extract::State, routing::post, Json, Router};
use nutri_common::ReadinessState;
use serde::Serialize;

use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ReinitializeResponse {
    /// False when a reset was already in progress or pending
    pub reinitialized: bool,
    pub readiness: ReadinessState,
}

/// POST /admin/reinitialize
///
/// Drops the cached store and reopens it, which starts a fresh two-phase
/// ingestion in the background. When a run is already in flight the
/// response waits for it to finish first; other endpoints keep answering
/// from the current store meanwhile.
pub async fn reinitialize(State(state): State<AppState>) -> ApiResult<Json<ReinitializeResponse>> {
    let reinitialized = state.provider.reinitialize().await?;
    state.provider.store().await?;

    Ok(Json(ReinitializeResponse {
        reinitialized,
        readiness: state.provider.readiness().current(),
    }))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/reinitialize", post(reinitialize))
}
