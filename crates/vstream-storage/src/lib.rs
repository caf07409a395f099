//! Byte storage for uploaded videos.
//!
//! Files are written once from a streaming reader and read back as chunked
//! streams, optionally restricted to an inclusive byte range.

pub mod error;
pub mod local;
pub mod range;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use local::LocalStorage;
pub use range::ByteRange;
pub use traits::{ByteStream, VideoStorage, CHUNK_SIZE};
