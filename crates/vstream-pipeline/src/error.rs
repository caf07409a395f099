//! Pipeline error types.

use thiserror::Error;
use vstream_records::RecordError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline already running for video {0}")]
    AlreadyRunning(String),

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("Record store error: {0}")]
    Record(#[from] RecordError),
}

impl PipelineError {
    pub fn classification_failed(msg: impl Into<String>) -> Self {
        Self::ClassificationFailed(msg.into())
    }
}
