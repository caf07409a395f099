//! Ingestion run driver.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::Instrument;
use vstream_models::{Sensitivity, VideoId, VideoPatch, VideoRecord, VideoStatus};
use vstream_records::{RecordError, RecordStore};

use crate::classifier::Classifier;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::progress::ProgressBroadcaster;
use crate::state_machine::{plan, Transition};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(Sensitivity),
    Failed,
    /// The record disappeared mid-run.
    Abandoned,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Completed(_) => "completed",
            RunOutcome::Failed => "failed",
            RunOutcome::Abandoned => "abandoned",
        }
    }
}

/// Sole writer of the pipeline-owned record fields.
///
/// Every transition is one store update followed by one publish of the
/// record the update returned.
#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn RecordStore>,
    broadcaster: ProgressBroadcaster,
    classifier: Arc<dyn Classifier>,
    config: PipelineConfig,
    active: Arc<Mutex<HashSet<VideoId>>>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        broadcaster: ProgressBroadcaster,
        classifier: Arc<dyn Classifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            classifier,
            config: config.normalized(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn broadcaster(&self) -> &ProgressBroadcaster {
        &self.broadcaster
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_running(&self, id: &VideoId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    pub fn active_runs(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Spawn a run for `id`. A second start while one is active is rejected.
    pub fn start(&self, id: VideoId) -> PipelineResult<JoinHandle<RunOutcome>> {
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if !active.insert(id.clone()) {
                return Err(PipelineError::AlreadyRunning(id.to_string()));
            }
        }
        metrics::record_run_started();

        let pipeline = self.clone();
        let logger = RunLogger::new(&id);
        let span = logger.create_span();

        Ok(tokio::spawn(
            async move {
                let _guard = scopeguard::guard(
                    (pipeline.active.clone(), id.clone()),
                    |(active, id)| {
                        active
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(&id);
                    },
                );
                let outcome = pipeline.run(&id, &logger).await;
                metrics::record_run_finished(outcome.as_str());
                outcome
            }
            .instrument(span),
        ))
    }

    async fn run(&self, id: &VideoId, logger: &RunLogger) -> RunOutcome {
        logger.log_start();

        let mut record = match self.store.get(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                logger.log_warning("record not found, abandoning run");
                return RunOutcome::Abandoned;
            }
            Err(e) => return self.fail(id, logger, e.into()).await,
        };

        loop {
            let Some((transition, delay)) = plan(&record, &self.config) else {
                return Self::outcome_of(&record);
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let verdict = if transition == Transition::Classify {
                match self.classifier.classify(id).await {
                    Ok(verdict) => Some(verdict),
                    Err(e) => return self.fail(id, logger, e).await,
                }
            } else {
                None
            };

            let Some(patch) = transition.patch(verdict) else {
                return self
                    .fail(
                        id,
                        logger,
                        PipelineError::classification_failed("no verdict"),
                    )
                    .await;
            };

            match self.store.update(id, &patch).await {
                Ok(updated) => {
                    self.broadcaster.publish(updated.clone());
                    metrics::record_transition(updated.status.as_str());
                    logger.log_transition(&updated);
                    record = updated;
                }
                Err(RecordError::NotFound(_)) => {
                    logger.log_warning("record deleted mid-run, abandoning");
                    return RunOutcome::Abandoned;
                }
                Err(e) => return self.fail(id, logger, e.into()).await,
            }

            if record.is_terminal() {
                logger.log_completion(&record);
                return Self::outcome_of(&record);
            }
        }
    }

    /// Move the record to `failed` and publish it.
    async fn fail(&self, id: &VideoId, logger: &RunLogger, error: PipelineError) -> RunOutcome {
        logger.log_error(&error.to_string());

        match self.store.update(id, &VideoPatch::fail()).await {
            Ok(failed) => {
                self.broadcaster.publish(failed.clone());
                metrics::record_transition(failed.status.as_str());
                logger.log_completion(&failed);
                RunOutcome::Failed
            }
            Err(RecordError::NotFound(_)) => {
                logger.log_warning("record deleted before failure could be recorded");
                RunOutcome::Abandoned
            }
            Err(e) => {
                logger.log_error(&format!("could not record failure: {}", e));
                RunOutcome::Failed
            }
        }
    }

    fn outcome_of(record: &VideoRecord) -> RunOutcome {
        match (record.status, record.sensitivity) {
            (VideoStatus::Completed, Some(sensitivity)) => RunOutcome::Completed(sensitivity),
            _ => RunOutcome::Failed,
        }
    }
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("config", &self.config)
            .field("active_runs", &self.active_runs())
            .finish()
    }
}
