//! Transition table of an ingestion run.
//!
//! | from                  | to                         |
//! |-----------------------|----------------------------|
//! | uploading, p < 100    | uploading, p + upload step |
//! | uploading, p = 100    | processing, 0              |
//! | processing, p < 100   | processing, p + step       |
//! | processing, p = 100   | completed (classified)     |
//!
//! Steps are capped so every phase hits 100 exactly.

use std::time::Duration;
use vstream_models::{Sensitivity, VideoPatch, VideoRecord, VideoStatus};

use crate::config::PipelineConfig;

/// Next write of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    UploadProgress(u8),
    StartProcessing,
    ProcessingProgress(u8),
    /// Final processing tick; needs a classifier verdict.
    Classify,
}

impl Transition {
    /// Patch for this transition. `Classify` consumes the verdict.
    pub fn patch(self, verdict: Option<Sensitivity>) -> Option<VideoPatch> {
        match self {
            Transition::UploadProgress(p) | Transition::ProcessingProgress(p) => {
                Some(VideoPatch::progress(p))
            }
            Transition::StartProcessing => Some(VideoPatch::start_processing()),
            Transition::Classify => verdict.map(VideoPatch::complete),
        }
    }
}

/// Next transition for `record` and the delay before it fires.
///
/// Terminal records have none.
pub fn plan(record: &VideoRecord, config: &PipelineConfig) -> Option<(Transition, Duration)> {
    match record.status {
        VideoStatus::Uploading if record.progress >= 100 => {
            Some((Transition::StartProcessing, config.upload_tick))
        }
        VideoStatus::Uploading => Some((
            Transition::UploadProgress(advance(record.progress, config.upload_step)),
            config.upload_tick,
        )),
        VideoStatus::Processing if record.progress >= 100 => {
            Some((Transition::Classify, config.processing_tick))
        }
        VideoStatus::Processing => Some((
            Transition::ProcessingProgress(advance(record.progress, config.processing_step)),
            config.processing_tick,
        )),
        VideoStatus::Completed | VideoStatus::Failed => None,
    }
}

fn advance(progress: u8, step: u8) -> u8 {
    progress.saturating_add(step.max(1)).min(100)
}
