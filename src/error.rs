use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A single malformed entry in an ingest batch
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid reading at index {index}: {reason}")]
pub struct ValidationError {
    /// Position of the offending entry in the batch
    pub index: usize,
    /// What was wrong with it
    pub reason: String,
}

impl ValidationError {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the ingest and trigger calls
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Structured error payload returned to ingest/trigger callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IngestError {
    /// HTTP-equivalent failure status for this error
    pub fn status(&self) -> u16 {
        match self {
            IngestError::Validation(_) => 400,
            IngestError::Store(_) => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            status: self.status(),
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),
}
