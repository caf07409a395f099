//! Record store error types.

use thiserror::Error;
use vstream_models::ModelError;

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(#[from] ModelError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl RecordError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
