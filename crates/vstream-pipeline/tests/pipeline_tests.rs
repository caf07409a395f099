//! End-to-end ingestion runs against the in-memory record store.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vstream_models::{Sensitivity, VideoId, VideoPatch, VideoRecord, VideoStatus};
use vstream_pipeline::{
    Classifier, IngestionPipeline, PipelineConfig, PipelineError, PipelineResult,
    ProgressBroadcaster, ProgressSubscription, RunOutcome, StaticClassifier,
};
use vstream_records::{
    ListFilter, MemoryRecordStore, RecordError, RecordResult, RecordStore,
};

struct BrokenClassifier;

#[async_trait]
impl Classifier for BrokenClassifier {
    async fn classify(&self, _id: &VideoId) -> PipelineResult<Sensitivity> {
        Err(PipelineError::classification_failed("model offline"))
    }
}

/// Memory store that rejects the `fail_at`-th progress write.
///
/// Writes that mark a record failed always go through.
struct FlakyStore {
    inner: MemoryRecordStore,
    writes: AtomicUsize,
    fail_at: usize,
}

impl FlakyStore {
    fn new(fail_at: usize) -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            writes: AtomicUsize::new(0),
            fail_at,
        }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn create(&self, record: VideoRecord) -> RecordResult<VideoRecord> {
        self.inner.create(record).await
    }

    async fn get(&self, id: &VideoId) -> RecordResult<Option<VideoRecord>> {
        self.inner.get(id).await
    }

    async fn update(&self, id: &VideoId, patch: &VideoPatch) -> RecordResult<VideoRecord> {
        if patch.status != Some(VideoStatus::Failed) {
            let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_at {
                return Err(RecordError::Unavailable("connection reset".to_string()));
            }
        }
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &VideoId) -> RecordResult<bool> {
        self.inner.delete(id).await
    }

    async fn list(&self, filter: &ListFilter) -> RecordResult<Vec<VideoRecord>> {
        self.inner.list(filter).await
    }
}

struct Fixture {
    store: Arc<MemoryRecordStore>,
    pipeline: IngestionPipeline,
    events: ProgressSubscription,
}

fn fixture(classifier: Arc<dyn Classifier>, config: PipelineConfig) -> Fixture {
    let store = Arc::new(MemoryRecordStore::new());
    let broadcaster = ProgressBroadcaster::new(512);
    let events = broadcaster.subscribe();
    let pipeline = IngestionPipeline::new(store.clone(), broadcaster, classifier, config);
    Fixture {
        store,
        pipeline,
        events,
    }
}

async fn seed(store: &MemoryRecordStore) -> VideoRecord {
    store
        .create(VideoRecord::new("owner-1", "clip.mp4", "clip.mp4", 1000))
        .await
        .unwrap()
}

fn drain(events: &mut ProgressSubscription) -> Vec<VideoRecord> {
    let mut seen = Vec::new();
    while let Some(record) = events.try_recv() {
        seen.push(record);
    }
    seen
}

#[tokio::test]
async fn test_run_reaches_completed_with_ordered_snapshots() {
    let mut fx = fixture(
        Arc::new(StaticClassifier(Sensitivity::Flagged)),
        PipelineConfig::immediate(),
    );
    let record = seed(&fx.store).await;

    let outcome = fx.pipeline.start(record.id.clone()).unwrap().await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed(Sensitivity::Flagged));

    let snapshots = drain(&mut fx.events);
    // 10 upload ticks, the phase change, 5 processing ticks, completion
    assert_eq!(snapshots.len(), 17);
    assert!(snapshots.iter().all(|s| s.id == record.id));

    let mut resets = 0;
    for pair in snapshots.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.status == next.status {
            assert!(next.progress >= prev.progress, "progress went backwards");
        } else if next.status == VideoStatus::Processing {
            assert_eq!(prev.progress, 100);
            assert_eq!(next.progress, 0);
            resets += 1;
        }
    }
    assert_eq!(resets, 1);

    for s in &snapshots[..snapshots.len() - 1] {
        assert_eq!(s.sensitivity, None);
    }
    let last = snapshots.last().unwrap();
    assert_eq!(last.status, VideoStatus::Completed);
    assert_eq!(last.progress, 100);
    assert_eq!(last.sensitivity, Some(Sensitivity::Flagged));

    let stored = fx.store.get(&record.id).await.unwrap().unwrap();
    assert_eq!(&stored, last);
}

#[tokio::test]
async fn test_classifier_fault_moves_record_to_failed() {
    let mut fx = fixture(Arc::new(BrokenClassifier), PipelineConfig::immediate());
    let record = seed(&fx.store).await;

    let outcome = fx.pipeline.start(record.id.clone()).unwrap().await.unwrap();
    assert_eq!(outcome, RunOutcome::Failed);

    let snapshots = drain(&mut fx.events);
    let last = snapshots.last().unwrap();
    assert_eq!(last.status, VideoStatus::Failed);
    assert_eq!(last.sensitivity, None);
    assert_eq!(
        snapshots
            .iter()
            .filter(|s| s.status == VideoStatus::Failed)
            .count(),
        1
    );

    let stored = fx.store.get(&record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, VideoStatus::Failed);
}

#[tokio::test]
async fn test_store_fault_mid_run_moves_record_to_failed() {
    let store = Arc::new(FlakyStore::new(13));
    let broadcaster = ProgressBroadcaster::new(512);
    let mut events = broadcaster.subscribe();
    let pipeline = IngestionPipeline::new(
        store.clone(),
        broadcaster,
        Arc::new(StaticClassifier(Sensitivity::Safe)),
        PipelineConfig::immediate(),
    );
    let record = store
        .create(VideoRecord::new("owner-1", "clip.mp4", "clip.mp4", 1000))
        .await
        .unwrap();

    let outcome = pipeline.start(record.id.clone()).unwrap().await.unwrap();
    assert_eq!(outcome, RunOutcome::Failed);

    // 10 upload ticks, the phase change and one processing tick land before the fault
    let snapshots = drain(&mut events);
    assert_eq!(snapshots.len(), 13);
    let last = snapshots.last().unwrap();
    assert_eq!(last.status, VideoStatus::Failed);
    assert_eq!(last.progress, 20);
    assert_eq!(last.sensitivity, None);
    assert!(snapshots[..12]
        .iter()
        .all(|s| !s.is_terminal() && s.sensitivity.is_none()));

    let stored = store.get(&record.id).await.unwrap().unwrap();
    assert_eq!(&stored, last);
    assert_eq!(pipeline.active_runs(), 0);
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let config = PipelineConfig {
        upload_tick: Duration::from_millis(20),
        processing_tick: Duration::from_millis(20),
        ..PipelineConfig::immediate()
    };
    let fx = fixture(Arc::new(StaticClassifier(Sensitivity::Safe)), config);
    let record = seed(&fx.store).await;

    let handle = fx.pipeline.start(record.id.clone()).unwrap();
    assert!(fx.pipeline.is_running(&record.id));
    assert!(matches!(
        fx.pipeline.start(record.id.clone()),
        Err(PipelineError::AlreadyRunning(_))
    ));

    assert_eq!(
        handle.await.unwrap(),
        RunOutcome::Completed(Sensitivity::Safe)
    );
    assert!(!fx.pipeline.is_running(&record.id));
}

#[tokio::test]
async fn test_deleted_record_abandons_run() {
    let config = PipelineConfig {
        upload_tick: Duration::from_millis(30),
        ..PipelineConfig::immediate()
    };
    let mut fx = fixture(Arc::new(StaticClassifier(Sensitivity::Safe)), config);
    let record = seed(&fx.store).await;

    let handle = fx.pipeline.start(record.id.clone()).unwrap();
    assert!(fx.store.delete(&record.id).await.unwrap());

    assert_eq!(handle.await.unwrap(), RunOutcome::Abandoned);
    assert!(drain(&mut fx.events)
        .iter()
        .all(|s| s.status != VideoStatus::Failed));
    assert!(fx.store.get(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_id_is_abandoned() {
    let fx = fixture(
        Arc::new(StaticClassifier(Sensitivity::Safe)),
        PipelineConfig::immediate(),
    );
    let outcome = fx.pipeline.start(VideoId::new()).unwrap().await.unwrap();
    assert_eq!(outcome, RunOutcome::Abandoned);
    assert_eq!(fx.pipeline.active_runs(), 0);
}
