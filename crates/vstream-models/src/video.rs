//! Video record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Bytes are being ingested
    #[default]
    Uploading,
    /// Content analysis is running
    Processing,
    /// Ready for playback, sensitivity assigned
    Completed,
    /// Pipeline hit a fault
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploading => "uploading",
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }

    /// Whether a record in this status may be moved to `next`.
    ///
    /// Staying in the same running phase is allowed (progress ticks).
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        match (self, next) {
            (VideoStatus::Uploading, VideoStatus::Uploading)
            | (VideoStatus::Uploading, VideoStatus::Processing)
            | (VideoStatus::Uploading, VideoStatus::Failed)
            | (VideoStatus::Processing, VideoStatus::Processing)
            | (VideoStatus::Processing, VideoStatus::Completed)
            | (VideoStatus::Processing, VideoStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Content sensitivity label assigned once, at completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Safe,
    Flagged,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Safe => "safe",
            Sensitivity::Flagged => "flagged",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected record mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("record is already {0} and accepts no further updates")]
    TerminalState(VideoStatus),

    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: VideoStatus, to: VideoStatus },

    #[error("progress {0} is out of range (0-100)")]
    ProgressOutOfRange(u8),

    #[error("progress cannot go back from {from} to {to} within a phase")]
    ProgressRegression { from: u8, to: u8 },

    #[error("{status} phase must reach 100 before leaving it (at {progress})")]
    PhaseIncomplete { status: VideoStatus, progress: u8 },

    #[error("sensitivity can only be assigned on completion")]
    SensitivityWithoutCompletion,

    #[error("completion requires a sensitivity label")]
    MissingSensitivity,

    #[error("sensitivity is already assigned")]
    SensitivityAlreadySet,

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Partial update of the pipeline-owned fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
}

impl VideoPatch {
    /// Advance progress within the current phase.
    pub fn progress(value: u8) -> Self {
        Self {
            progress: Some(value),
            ..Default::default()
        }
    }

    /// Enter the processing phase at 0.
    pub fn start_processing() -> Self {
        Self {
            status: Some(VideoStatus::Processing),
            progress: Some(0),
            sensitivity: None,
        }
    }

    /// Finish with the classifier's verdict.
    pub fn complete(sensitivity: Sensitivity) -> Self {
        Self {
            status: Some(VideoStatus::Completed),
            progress: None,
            sensitivity: Some(sensitivity),
        }
    }

    /// Escape hatch into the failed state.
    pub fn fail() -> Self {
        Self {
            status: Some(VideoStatus::Failed),
            ..Default::default()
        }
    }
}

/// Video record as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique video ID
    pub id: VideoId,

    /// Uploading user
    pub owner_id: String,

    /// Display name (original filename)
    pub title: String,

    /// Key of the stored byte stream
    pub storage_ref: String,

    /// Stored length in bytes
    pub size_bytes: u64,

    /// Lifecycle status
    #[serde(default)]
    pub status: VideoStatus,

    /// Progress within the current phase (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Classification label, present only once completed
    #[serde(default)]
    pub sensitivity: Option<Sensitivity>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a new record in its initial `uploading` state.
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        storage_ref: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: VideoId::new(),
            owner_id: owner_id.into(),
            title: title.into(),
            storage_ref: storage_ref.into(),
            size_bytes,
            status: VideoStatus::Uploading,
            progress: 0,
            sensitivity: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a patch, enforcing the lifecycle invariants.
    ///
    /// The record is left untouched when the patch is rejected.
    pub fn apply(&mut self, patch: &VideoPatch) -> Result<(), ModelError> {
        if self.status.is_terminal() {
            return Err(ModelError::TerminalState(self.status));
        }

        let next_status = patch.status.unwrap_or(self.status);
        if !self.status.can_transition_to(next_status) {
            return Err(ModelError::InvalidTransition {
                from: self.status,
                to: next_status,
            });
        }

        let phase_change = next_status != self.status;
        if phase_change && next_status != VideoStatus::Failed && self.progress < 100 {
            return Err(ModelError::PhaseIncomplete {
                status: self.status,
                progress: self.progress,
            });
        }

        let next_progress = match (patch.progress, next_status) {
            (Some(p), _) if p > 100 => return Err(ModelError::ProgressOutOfRange(p)),
            (Some(p), _) if !phase_change && p < self.progress => {
                return Err(ModelError::ProgressRegression {
                    from: self.progress,
                    to: p,
                })
            }
            (Some(p), _) => p,
            (None, VideoStatus::Processing) if phase_change => 0,
            (None, _) => self.progress,
        };

        match (patch.sensitivity, next_status) {
            (Some(_), _) if self.sensitivity.is_some() => {
                return Err(ModelError::SensitivityAlreadySet)
            }
            (Some(_), status) if status != VideoStatus::Completed => {
                return Err(ModelError::SensitivityWithoutCompletion)
            }
            (None, VideoStatus::Completed) => return Err(ModelError::MissingSensitivity),
            _ => {}
        }

        self.status = next_status;
        self.progress = next_progress;
        if patch.sensitivity.is_some() {
            self.sensitivity = patch.sensitivity;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(status: VideoStatus, progress: u8) -> VideoRecord {
        let mut record = VideoRecord::new("user-1", "clip.mp4", "abc.mp4", 1000);
        record.status = status;
        record.progress = progress;
        record
    }

    #[test]
    fn test_video_id_generation() {
        let id1 = VideoId::new();
        let id2 = VideoId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_record_is_uploading() {
        let record = VideoRecord::new("user-1", "clip.mp4", "abc.mp4", 1000);
        assert_eq!(record.status, VideoStatus::Uploading);
        assert_eq!(record.progress, 0);
        assert_eq!(record.sensitivity, None);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&VideoStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");

        let record = VideoRecord::new("user-1", "clip.mp4", "abc.mp4", 1000);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "uploading");
        assert!(value["sensitivity"].is_null());
    }

    #[test]
    fn test_progress_ticks_within_phase() {
        let mut record = record_at(VideoStatus::Uploading, 10);
        record.apply(&VideoPatch::progress(20)).unwrap();
        assert_eq!(record.progress, 20);

        let err = record.apply(&VideoPatch::progress(10)).unwrap_err();
        assert_eq!(err, ModelError::ProgressRegression { from: 20, to: 10 });

        let err = record.apply(&VideoPatch::progress(101)).unwrap_err();
        assert_eq!(err, ModelError::ProgressOutOfRange(101));
    }

    #[test]
    fn test_phase_change_requires_full_progress() {
        let mut record = record_at(VideoStatus::Uploading, 90);
        let err = record.apply(&VideoPatch::start_processing()).unwrap_err();
        assert!(matches!(err, ModelError::PhaseIncomplete { .. }));

        let mut record = record_at(VideoStatus::Uploading, 100);
        tokio_test::assert_ok!(record.apply(&VideoPatch::start_processing()));
        assert_eq!(record.status, VideoStatus::Processing);
        assert_eq!(record.progress, 0);
    }

    #[test]
    fn test_completion_assigns_sensitivity_once() {
        let mut record = record_at(VideoStatus::Processing, 100);
        let err = record
            .apply(&VideoPatch {
                status: Some(VideoStatus::Completed),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ModelError::MissingSensitivity);

        record.apply(&VideoPatch::complete(Sensitivity::Flagged)).unwrap();
        assert_eq!(record.status, VideoStatus::Completed);
        assert_eq!(record.sensitivity, Some(Sensitivity::Flagged));

        let err = record.apply(&VideoPatch::fail()).unwrap_err();
        assert_eq!(err, ModelError::TerminalState(VideoStatus::Completed));
    }

    #[test]
    fn test_sensitivity_rejected_before_completion() {
        let mut record = record_at(VideoStatus::Processing, 40);
        let err = record
            .apply(&VideoPatch {
                sensitivity: Some(Sensitivity::Safe),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ModelError::SensitivityWithoutCompletion);
        assert_eq!(record.sensitivity, None);
    }

    #[test]
    fn test_fail_from_any_running_phase() {
        for (status, progress) in [(VideoStatus::Uploading, 30), (VideoStatus::Processing, 60)] {
            let mut record = record_at(status, progress);
            record.apply(&VideoPatch::fail()).unwrap();
            assert_eq!(record.status, VideoStatus::Failed);
            assert_eq!(record.progress, progress);
            assert_eq!(record.sensitivity, None);
        }
    }

    #[test]
    fn test_no_skipping_processing() {
        let mut record = record_at(VideoStatus::Uploading, 100);
        let err = record.apply(&VideoPatch::complete(Sensitivity::Safe)).unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidTransition {
                from: VideoStatus::Uploading,
                to: VideoStatus::Completed
            }
        );
    }
}
