//! Structured run logging.

use tracing::{error, info, warn, Span};
use vstream_models::{VideoId, VideoRecord};

/// Consistent log lines for one ingestion run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    video_id: String,
}

impl RunLogger {
    pub fn new(video_id: &VideoId) -> Self {
        Self {
            video_id: video_id.to_string(),
        }
    }

    pub fn log_start(&self) {
        info!(video_id = %self.video_id, "Ingestion started");
    }

    /// One line per persisted transition.
    pub fn log_transition(&self, record: &VideoRecord) {
        info!(
            video_id = %self.video_id,
            status = %record.status,
            progress = record.progress,
            "Ingestion progress"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(video_id = %self.video_id, "Ingestion warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(video_id = %self.video_id, "Ingestion error: {}", message);
    }

    pub fn log_completion(&self, record: &VideoRecord) {
        info!(
            video_id = %self.video_id,
            status = %record.status,
            sensitivity = ?record.sensitivity,
            "Ingestion finished"
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Span covering the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("ingestion", video_id = %self.video_id)
    }
}
