//! nutri-ingest library interface
//!
//! Two-phase dataset ingestion, the store provider that triggers it, and the
//! HTTP query surface. Exposed as a library for integration testing.

pub mod api;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod provider;
pub mod source;

pub use crate::error::{ApiError, ApiResult, IngestError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::provider::StoreProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<StoreProvider>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(provider: Arc<StoreProvider>) -> Self {
        Self {
            provider,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::user_routes())
        .merge(api::stats_routes())
        .merge(api::admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
