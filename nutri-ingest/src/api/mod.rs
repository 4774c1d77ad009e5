//! HTTP API handlers for nutri-ingest
//!
//! Read-mostly query surface over the record store. Query failures are
//! reported as absence (404, empty list, zero), never as a crash.

pub mod admin;
pub mod health;
pub mod stats;
pub mod users;

pub use admin::admin_routes;
pub use health::health_routes;
pub use stats::stats_routes;
pub use users::user_routes;
