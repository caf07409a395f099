//! In-process record store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use vstream_models::{VideoId, VideoPatch, VideoRecord};

use crate::error::{RecordError, RecordResult};
use crate::store::{ListFilter, RecordStore};

/// Record store backed by a locked hash map.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<VideoId, VideoRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, record: VideoRecord) -> RecordResult<VideoRecord> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(RecordError::AlreadyExists(record.id.to_string()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &VideoId) -> RecordResult<Option<VideoRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update(&self, id: &VideoId, patch: &VideoPatch) -> RecordResult<VideoRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| RecordError::not_found(id.as_str()))?;

        record.apply(patch)?;

        debug!(
            video_id = %id,
            status = %record.status,
            progress = record.progress,
            "Record updated"
        );
        Ok(record.clone())
    }

    async fn delete(&self, id: &VideoId) -> RecordResult<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn list(&self, filter: &ListFilter) -> RecordResult<Vec<VideoRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<VideoRecord> = records
            .values()
            .filter(|r| match &filter.owner {
                Some(owner) => &r.owner_id == owner,
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vstream_models::{ModelError, Sensitivity, VideoStatus};

    fn record(owner: &str, age_secs: i64) -> VideoRecord {
        let mut record = VideoRecord::new(owner, "clip.mp4", "clip.mp4", 10);
        record.created_at = record.created_at - Duration::seconds(age_secs);
        record
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryRecordStore::new();
        let created = store.create(record("u1", 0)).await.unwrap();

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(store.get(&VideoId::new()).await.unwrap().is_none());

        let dup = store.create(created.clone()).await;
        assert!(matches!(dup, Err(RecordError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_update_returns_refreshed_record() {
        let store = MemoryRecordStore::new();
        let created = store.create(record("u1", 0)).await.unwrap();

        let updated = store
            .update(&created.id, &VideoPatch::progress(100))
            .await
            .unwrap();
        assert_eq!(updated.progress, 100);

        let updated = store
            .update(&created.id, &VideoPatch::start_processing())
            .await
            .unwrap();
        assert_eq!(updated.status, VideoStatus::Processing);
        assert_eq!(updated.progress, 0);
        assert_eq!(store.get(&created.id).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_record_untouched() {
        let store = MemoryRecordStore::new();
        let created = store.create(record("u1", 0)).await.unwrap();
        store
            .update(&created.id, &VideoPatch::progress(50))
            .await
            .unwrap();

        let err = store
            .update(&created.id, &VideoPatch::complete(Sensitivity::Safe))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::InvalidUpdate(ModelError::InvalidTransition { .. })
        ));

        let stored = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, VideoStatus::Uploading);
        assert_eq!(stored.progress, 50);
        assert_eq!(stored.sensitivity, None);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = MemoryRecordStore::new();
        let err = tokio_test::assert_err!(
            store
                .update(&VideoId::new(), &VideoPatch::progress(10))
                .await
        );
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts_newest_first() {
        let store = MemoryRecordStore::new();
        let old = store.create(record("u1", 60)).await.unwrap();
        let new = store.create(record("u1", 1)).await.unwrap();
        let other = store.create(record("u2", 30)).await.unwrap();

        let mine = store.list(&ListFilter::owned_by("u1")).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![new.id.clone(), old.id.clone()]);

        let all = store.list(&ListFilter::all()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![new.id, other.id, old.id]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryRecordStore::new();
        let created = store.create(record("u1", 0)).await.unwrap();

        assert!(store.delete(&created.id).await.unwrap());
        assert!(!store.delete(&created.id).await.unwrap());
        assert!(store.is_empty().await);
    }
}
