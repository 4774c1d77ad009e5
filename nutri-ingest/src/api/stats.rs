//! Population statistics endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use nutri_common::error::or_absent;
use serde::{Deserialize, Serialize};

use crate::{ApiResult, AppState};

/// Threshold used by `/stats/thresholds` when no `score` is given
pub const DEFAULT_SCORE_THRESHOLD: f64 = 50.0;

#[derive(Debug, Deserialize)]
pub struct AverageParams {
    pub sex: String,
}

#[derive(Debug, Serialize)]
pub struct AverageResponse {
    pub component: String,
    pub sex: String,
    pub average: f64,
}

/// GET /stats/average/:component?sex=
///
/// `component` may also be `total` for the overall HEIFA score.
pub async fn average(
    State(state): State<AppState>,
    Path(component): Path<String>,
    Query(params): Query<AverageParams>,
) -> ApiResult<Json<AverageResponse>> {
    let store = state.provider.store().await?;
    let aggregates = store.aggregates();

    let average = if component.eq_ignore_ascii_case("total") {
        aggregates.average_total_score_by_sex(&params.sex).await
    } else {
        aggregates.average_component_by_sex(&component, &params.sex).await
    };

    Ok(Json(AverageResponse {
        average: or_absent(average, "average"),
        component,
        sex: params.sex,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ThresholdParams {
    pub score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ThresholdResponse {
    pub score: f64,
    pub total_score_above: i64,
    pub total_score_below: i64,
    pub high_water_intake: i64,
    pub high_sodium: i64,
    pub alcohol_consumers: i64,
    pub male: i64,
    pub female: i64,
}

/// GET /stats/thresholds?score=
pub async fn thresholds(
    State(state): State<AppState>,
    Query(params): Query<ThresholdParams>,
) -> ApiResult<Json<ThresholdResponse>> {
    let store = state.provider.store().await?;
    let aggregates = store.aggregates();
    let score = params.score.unwrap_or(DEFAULT_SCORE_THRESHOLD);

    Ok(Json(ThresholdResponse {
        score,
        total_score_above: or_absent(aggregates.count_total_score_above(score).await, "count_total_score_above"),
        total_score_below: or_absent(aggregates.count_total_score_below(score).await, "count_total_score_below"),
        high_water_intake: or_absent(aggregates.count_high_water_intake().await, "count_high_water_intake"),
        high_sodium: or_absent(aggregates.count_high_sodium().await, "count_high_sodium"),
        alcohol_consumers: or_absent(aggregates.count_alcohol_consumers().await, "count_alcohol_consumers"),
        male: or_absent(aggregates.count_by_sex("Male").await, "count_by_sex"),
        female: or_absent(aggregates.count_by_sex("Female").await, "count_by_sex"),
    }))
}

/// Build statistics routes
pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/stats/average/:component", get(average))
        .route("/stats/thresholds", get(thresholds))
}
