use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::error::StorageResult;
use crate::range::ByteRange;

/// Size of each chunk yielded by [`VideoStorage::open`].
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunked byte stream of stored content.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Storage for uploaded video bytes, addressed by key.
#[async_trait]
pub trait VideoStorage: Send + Sync {
    /// Write all bytes from `reader` under `key`. Returns the stored length.
    ///
    /// A failed write leaves nothing behind under `key`.
    async fn save(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Current stored length in bytes.
    async fn size(&self, key: &str) -> StorageResult<u64>;

    /// Open a stream over the whole object or over `range`.
    async fn open(&self, key: &str, range: Option<ByteRange>) -> StorageResult<ByteStream>;

    /// Remove the object. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn health_check(&self) -> StorageResult<()>;
}
