//! Pipeline configuration.

use std::time::Duration;

/// Cadence and classifier settings for ingestion runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Progress added per upload tick (1-100)
    pub upload_step: u8,
    /// Delay before each upload-phase transition
    pub upload_tick: Duration,
    /// Progress added per processing tick (1-100)
    pub processing_step: u8,
    /// Delay before each processing-phase transition
    pub processing_tick: Duration,
    /// Probability that the simulated classifier flags a video
    pub flag_ratio: f64,
    /// Simulated classifier latency
    pub classify_delay: Duration,
    /// Ring size of the progress broadcaster
    pub progress_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_step: 10,
            upload_tick: Duration::from_millis(200),
            processing_step: 20,
            processing_tick: Duration::from_millis(300),
            flag_ratio: 0.3,
            classify_delay: Duration::ZERO,
            progress_buffer: 256,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            upload_step: std::env::var("PIPELINE_UPLOAD_STEP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.upload_step),
            upload_tick: Duration::from_millis(
                std::env::var("PIPELINE_UPLOAD_TICK_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200),
            ),
            processing_step: std::env::var("PIPELINE_PROCESSING_STEP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.processing_step),
            processing_tick: Duration::from_millis(
                std::env::var("PIPELINE_PROCESSING_TICK_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            flag_ratio: std::env::var("PIPELINE_FLAG_RATIO")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.flag_ratio),
            classify_delay: Duration::from_millis(
                std::env::var("PIPELINE_CLASSIFY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
            ),
            progress_buffer: std::env::var("PROGRESS_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.progress_buffer),
        }
        .normalized()
    }

    /// No delays anywhere. Runs finish as fast as the store allows.
    pub fn immediate() -> Self {
        Self {
            upload_tick: Duration::ZERO,
            processing_tick: Duration::ZERO,
            classify_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Clamp values into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.upload_step = self.upload_step.clamp(1, 100);
        self.processing_step = self.processing_step.clamp(1, 100);
        self.flag_ratio = if self.flag_ratio.is_finite() {
            self.flag_ratio.clamp(0.0, 1.0)
        } else {
            Self::default().flag_ratio
        };
        self.progress_buffer = self.progress_buffer.max(1);
        self
    }
}
