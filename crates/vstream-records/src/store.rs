use async_trait::async_trait;
use vstream_models::{VideoId, VideoPatch, VideoRecord};

use crate::error::RecordResult;

/// Listing filter.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only records created by this user; `None` lists everything.
    pub owner: Option<String>,
}

impl ListFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
        }
    }
}

/// Keyed storage of video records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record. Fails if the id is already taken.
    async fn create(&self, record: VideoRecord) -> RecordResult<VideoRecord>;

    async fn get(&self, id: &VideoId) -> RecordResult<Option<VideoRecord>>;

    /// Atomically apply a partial update and return the refreshed record.
    async fn update(&self, id: &VideoId, patch: &VideoPatch) -> RecordResult<VideoRecord>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, id: &VideoId) -> RecordResult<bool>;

    /// Matching records, newest first.
    async fn list(&self, filter: &ListFilter) -> RecordResult<Vec<VideoRecord>>;
}
