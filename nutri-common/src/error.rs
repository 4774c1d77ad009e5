//! Common error types for NutriTrack

use thiserror::Error;

/// Common result type for NutriTrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across NutriTrack services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Collapse a failed query into "no result"
///
/// Query failures are surfaced to presentation-layer callers as absence
/// (`None`, an empty list, zero) rather than as errors. The failure is logged.
pub fn or_absent<T: Default>(result: Result<T>, operation: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(operation, error = %e, "Query failed, returning empty result");
            T::default()
        }
    }
}
