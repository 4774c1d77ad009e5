//! Database models and queries

pub mod aggregates;
pub mod init;
pub mod marker;
pub mod migrations;
pub mod models;
pub mod preferences;
pub mod records;

pub use aggregates::*;
pub use init::*;
pub use marker::*;
pub use migrations::*;
pub use models::*;
pub use preferences::*;
pub use records::*;
