//! Store-layer error taxonomy.

use thiserror::Error;

/// Errors surfaced by the envelope and artifact stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Blob storage error: {0}")]
    Blob(String),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(why: impl Into<String>) -> Self {
        Self::Invalid(why.into())
    }

    pub fn database(why: impl Into<String>) -> Self {
        Self::Database(why.into())
    }

    pub fn blob(why: impl Into<String>) -> Self {
        Self::Blob(why.into())
    }
}
