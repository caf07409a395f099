//! Record store for video metadata.
//!
//! The store is the single shared mutable resource of the backend. Updates go
//! through [`VideoRecord::apply`](vstream_models::VideoRecord::apply) so that
//! lifecycle invariants are checked where the write happens.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{RecordError, RecordResult};
pub use memory::MemoryRecordStore;
pub use store::{ListFilter, RecordStore};
