//! Per-user endpoints: identifier list, insight view, preferences, account claim

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use nutri_common::db::models::FoodPreferences;
use nutri_common::error::or_absent;
use nutri_common::scoring::{project, InsightView};
use serde::{Deserialize, Serialize};

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub user_ids: Vec<String>,
}

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<UserListResponse>> {
    let store = state.provider.store().await?;
    let user_ids = or_absent(store.records().list_user_ids().await, "list_user_ids");
    Ok(Json(UserListResponse { user_ids }))
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub user_id: String,
    pub sex: String,
    /// False while only identity fields are loaded
    pub complete: bool,
    pub insight: InsightView,
}

/// GET /users/:id/insight
pub async fn get_insight(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<InsightResponse>> {
    let store = state.provider.store().await?;
    let record = or_absent(store.records().get(&user_id).await, "get_record");

    let Some(record) = record else {
        return Err(ApiError::NotFound(format!("user {}", user_id)));
    };

    Ok(Json(InsightResponse {
        insight: project(Some(&record)).unwrap_or_default(),
        complete: record.has_metrics(),
        user_id: record.user_id,
        sex: record.sex,
    }))
}

/// GET /users/:id/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<FoodPreferences>> {
    let store = state.provider.store().await?;
    or_absent(store.preferences().get(&user_id).await, "get_preferences")
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("preferences for user {}", user_id)))
}

/// PUT /users/:id/preferences
///
/// The path identifier wins over any `user_id` in the body.
pub async fn put_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(mut prefs): Json<FoodPreferences>,
) -> ApiResult<Json<FoodPreferences>> {
    let store = state.provider.store().await?;
    if !or_absent(store.records().exists(&user_id).await, "exists") {
        return Err(ApiError::NotFound(format!("user {}", user_id)));
    }

    prefs.user_id = user_id;
    store.preferences().save(&prefs).await?;
    Ok(Json(prefs))
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub user_id: String,
    pub claimed: bool,
}

/// POST /users/:id/claim
pub async fn claim_account(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ClaimRequest>,
) -> ApiResult<Json<ClaimResponse>> {
    if request.password.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty".to_string()));
    }

    let store = state.provider.store().await?;
    let claimed = store
        .records()
        .claim_account(&user_id, &request.phone_number, &request.password)
        .await?;

    if !claimed {
        return Err(ApiError::NotFound(format!(
            "no user {} with that phone number",
            user_id
        )));
    }

    Ok(Json(ClaimResponse { user_id, claimed }))
}

/// Build per-user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/insight", get(get_insight))
        .route("/users/:id/preferences", get(get_preferences).put(put_preferences))
        .route("/users/:id/claim", post(claim_account))
}
