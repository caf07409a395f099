//! Business logic services.

pub mod videos;

pub use videos::{UploadMeta, VideoService};
