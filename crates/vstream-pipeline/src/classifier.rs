//! Content classification.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use vstream_models::{Sensitivity, VideoId};

use crate::error::PipelineResult;

/// Assigns a sensitivity label to an ingested video.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, id: &VideoId) -> PipelineResult<Sensitivity>;
}

/// Random stand-in for a moderation model.
#[derive(Debug, Clone)]
pub struct SimulatedClassifier {
    flag_ratio: f64,
    delay: Duration,
}

impl SimulatedClassifier {
    pub fn new(flag_ratio: f64, delay: Duration) -> Self {
        let flag_ratio = if flag_ratio.is_finite() {
            flag_ratio.clamp(0.0, 1.0)
        } else {
            0.3
        };
        Self { flag_ratio, delay }
    }
}

impl Default for SimulatedClassifier {
    fn default() -> Self {
        Self::new(0.3, Duration::ZERO)
    }
}

#[async_trait]
impl Classifier for SimulatedClassifier {
    async fn classify(&self, id: &VideoId) -> PipelineResult<Sensitivity> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let flagged = rand::thread_rng().gen_bool(self.flag_ratio);
        let verdict = if flagged {
            Sensitivity::Flagged
        } else {
            Sensitivity::Safe
        };
        tracing::debug!(video_id = %id, sensitivity = %verdict, "Simulated classification");
        Ok(verdict)
    }
}

/// Always returns the same label.
#[derive(Debug, Clone, Copy)]
pub struct StaticClassifier(pub Sensitivity);

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(&self, _id: &VideoId) -> PipelineResult<Sensitivity> {
        Ok(self.0)
    }
}
