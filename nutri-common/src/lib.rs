//! # NutriTrack Common Library
//!
//! Shared code for the NutriTrack services including:
//! - Database initialization, schema migrations and the record/preference stores
//! - Aggregate queries over stored nutrition records
//! - Readiness state published by the ingestion pipeline
//! - Gender-aware score projection (insight views)
//! - Configuration loading and root folder resolution

pub mod config;
pub mod db;
pub mod error;
pub mod readiness;
pub mod scoring;

pub use error::{Error, Result};
pub use readiness::{ReadinessPublisher, ReadinessState};
