//! Video ingestion pipeline.
//!
//! Drives a video record from `uploading` through `processing` to a terminal
//! state, publishing every persisted transition on the progress broadcaster.

pub mod classifier;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod state_machine;

pub use classifier::{Classifier, SimulatedClassifier, StaticClassifier};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use pipeline::{IngestionPipeline, RunOutcome};
pub use progress::{ProgressBroadcaster, ProgressSubscription};
pub use state_machine::{plan, Transition};
