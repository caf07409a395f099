//! Application state.

use std::sync::Arc;

use vstream_pipeline::{
    Classifier, IngestionPipeline, PipelineConfig, ProgressBroadcaster, SimulatedClassifier,
};
use vstream_records::{MemoryRecordStore, RecordStore};
use vstream_storage::{LocalStorage, VideoStorage};

use crate::auth::AuthKeys;
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::services::VideoService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub auth: AuthKeys,
    pub records: Arc<dyn RecordStore>,
    pub storage: Arc<dyn VideoStorage>,
    pub broadcaster: ProgressBroadcaster,
    pub pipeline: IngestionPipeline,
    pub videos: VideoService,
}

impl AppState {
    /// Local disk storage, in-memory records and the simulated classifier.
    pub async fn new(config: ApiConfig, pipeline_config: PipelineConfig) -> ApiResult<Self> {
        let storage = LocalStorage::new(config.upload_dir.clone()).await?;
        let classifier =
            SimulatedClassifier::new(pipeline_config.flag_ratio, pipeline_config.classify_delay);

        Self::from_parts(
            config,
            pipeline_config,
            Arc::new(MemoryRecordStore::new()),
            Arc::new(storage),
            Arc::new(classifier),
        )
    }

    /// Wire the components around explicit collaborators.
    pub fn from_parts(
        config: ApiConfig,
        pipeline_config: PipelineConfig,
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn VideoStorage>,
        classifier: Arc<dyn Classifier>,
    ) -> ApiResult<Self> {
        let auth = AuthKeys::new(&config.jwt_secret, config.jwt_ttl)?;
        let broadcaster = ProgressBroadcaster::new(pipeline_config.progress_buffer);
        let pipeline = IngestionPipeline::new(
            Arc::clone(&records),
            broadcaster.clone(),
            classifier,
            pipeline_config,
        );
        let videos = VideoService::new(Arc::clone(&records), Arc::clone(&storage), pipeline.clone());

        Ok(Self {
            config,
            auth,
            records,
            storage,
            broadcaster,
            pipeline,
            videos,
        })
    }
}
