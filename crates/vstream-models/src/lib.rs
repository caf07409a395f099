//! Shared data models for the vstream backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and their lifecycle states
//! - Partial record updates with invariant checks
//! - Caller capabilities used by the access gate
//! - WebSocket message schemas

pub mod caller;
pub mod utils;
pub mod video;
pub mod ws;

// Re-export common types
pub use caller::{Caller, Role};
pub use utils::format_bytes;
pub use video::{ModelError, Sensitivity, VideoId, VideoPatch, VideoRecord, VideoStatus};
pub use ws::{WsMessage, WsMessageType};
