pub mod store;

pub use store::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportStoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Report payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema migration v{version} failed: {reason}")]
    MigrationFailed { version: i64, reason: String },
}
