use thiserror::Error;

use crate::filter::FilterError;
use crate::models::Collection;

/// Errors raised by content stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated on {collection}: {fields}")]
    Conflict { collection: Collection, fields: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid lifecycle transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(collection: Collection, id: i64) -> Self {
        StoreError::NotFound(format!("{} {}", collection, id))
    }

    pub fn conflict(collection: Collection) -> Self {
        StoreError::Conflict {
            collection,
            fields: collection.unique_fields().join(", "),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
