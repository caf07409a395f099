//! WebSocket message types for the progress socket.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::VideoRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Record snapshot after a pipeline transition
    VideoProgress,
    /// Error message
    Error,
}

impl WsMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WsMessageType::VideoProgress => "video_progress",
            WsMessageType::Error => "error",
        }
    }
}

/// WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Full record snapshot
    VideoProgress { video: VideoRecord },

    /// Error message
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl WsMessage {
    pub fn video_progress(video: VideoRecord) -> Self {
        Self::VideoProgress { video }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn message_type(&self) -> WsMessageType {
        match self {
            WsMessage::VideoProgress { .. } => WsMessageType::VideoProgress,
            WsMessage::Error { .. } => WsMessageType::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_progress_envelope() {
        let record = VideoRecord::new("user-1", "clip.mp4", "abc.mp4", 42);
        let msg = WsMessage::video_progress(record.clone());
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "video_progress");
        assert_eq!(json["video"]["id"], record.id.as_str());
        assert_eq!(json["video"]["progress"], 0);
        assert_eq!(msg.message_type().as_str(), "video_progress");
    }
}
