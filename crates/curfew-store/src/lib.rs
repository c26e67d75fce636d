//! Persistence layer for curfew
//!
//! Provides:
//! - Blocklists (one newline-delimited file per list, atomically replaced)
//! - Password file (SHA-256 digest)
//! - Audit log (append-only, SQLite)

mod atomic;
mod audit;
mod blocklist;
mod credentials;
mod sqlite;
mod traits;

pub use atomic::*;
pub use audit::*;
pub use blocklist::*;
pub use credentials::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
