//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupted draft payload: {0}")]
    CorruptedPayload(#[from] serde_json::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}
