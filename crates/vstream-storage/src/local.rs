//! Local filesystem storage.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::range::ByteRange;
use crate::traits::{ByteStream, VideoStorage, CHUNK_SIZE};

/// Stores each object as a flat file under a root directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create the storage, making sure the root directory exists.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::config_error(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys are single path components; anything that could escape the root
    /// is rejected.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    async fn metadata(&self, key: &str) -> StorageResult<std::fs::Metadata> {
        let path = self.key_to_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(meta),
            Ok(_) => Err(StorageError::not_found(key)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(
        path: &Path,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> std::io::Result<u64> {
        let mut file = fs::File::create(path).await?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl VideoStorage for LocalStorage {
    async fn save(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;
        let start = Instant::now();

        match Self::write_file(&path, reader).await {
            Ok(size) => {
                info!(
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Stored upload"
                );
                Ok(size)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(key = %key, error = %cleanup, "Failed to remove partial upload");
                    }
                }
                Err(StorageError::upload_failed(format!("{}: {}", key, e)))
            }
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.metadata(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn size(&self, key: &str) -> StorageResult<u64> {
        Ok(self.metadata(key).await?.len())
    }

    async fn open(&self, key: &str, range: Option<ByteRange>) -> StorageResult<ByteStream> {
        let path = self.key_to_path(key)?;
        let size = self.metadata(key).await?.len();

        let mut file = fs::File::open(&path).await.map_err(|e| {
            StorageError::download_failed(format!("Failed to open {}: {}", key, e))
        })?;

        let stream: ByteStream = match range {
            Some(range) => {
                if range.start >= size || range.end >= size {
                    return Err(StorageError::InvalidRange(format!(
                        "{}-{} outside 0-{}",
                        range.start,
                        range.end,
                        size.saturating_sub(1)
                    )));
                }
                file.seek(SeekFrom::Start(range.start)).await?;
                debug!(key = %key, start = range.start, end = range.end, "Opened ranged read");
                Box::pin(ReaderStream::with_capacity(file.take(range.len()), CHUNK_SIZE))
            }
            None => Box::pin(ReaderStream::with_capacity(file, CHUNK_SIZE)),
        };

        Ok(stream)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(key = %key, "Deleted stored file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key = %key, "Stored file already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::delete_failed(format!("{}: {}", key, e))),
        }
    }

    async fn health_check(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(StorageError::config_error(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    async fn collect(stream: ByteStream) -> Vec<u8> {
        stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let data = sample(1000);

        let written = storage.save("a.mp4", &mut data.as_slice()).await.unwrap();
        assert_eq!(written, 1000);
        assert!(storage.exists("a.mp4").await.unwrap());
        assert_eq!(storage.size("a.mp4").await.unwrap(), 1000);

        let body = collect(storage.open("a.mp4", None).await.unwrap()).await;
        assert_eq!(body, data);
    }

    #[tokio::test]
    async fn test_ranged_read_returns_exact_interval() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let data = sample(200_000);
        storage.save("big.mp4", &mut data.as_slice()).await.unwrap();

        let range = ByteRange::new(70_000, 150_000).unwrap();
        let body = collect(storage.open("big.mp4", Some(range)).await.unwrap()).await;
        assert_eq!(body.len() as u64, range.len());
        assert_eq!(body, data[70_000..=150_000]);
    }

    #[tokio::test]
    async fn test_range_past_end_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        storage.save("a.mp4", &mut sample(10).as_slice()).await.unwrap();

        let result = storage.open("a.mp4", ByteRange::new(5, 10)).await;
        assert!(matches!(result, Err(StorageError::InvalidRange(_))));
    }

    #[tokio::test]
    async fn test_missing_and_invalid_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(!storage.exists("nope.mp4").await.unwrap());
        assert!(storage.open("nope.mp4", None).await.err().unwrap().is_not_found());
        assert!(matches!(
            storage.size("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.save("sub/dir.mp4", &mut sample(1).as_slice()).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        storage.save("a.mp4", &mut sample(10).as_slice()).await.unwrap();

        storage.delete("a.mp4").await.unwrap();
        assert!(!storage.exists("a.mp4").await.unwrap());
        storage.delete("a.mp4").await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested")).await.unwrap();
        storage.health_check().await.unwrap();
    }
}
