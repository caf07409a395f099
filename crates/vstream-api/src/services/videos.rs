//! Video lifecycle operations behind the HTTP handlers.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::{error, info, warn};
use vstream_models::{format_bytes, Caller, VideoId, VideoRecord};
use vstream_pipeline::IngestionPipeline;
use vstream_records::{ListFilter, RecordStore};
use vstream_storage::{StorageError, VideoStorage};

use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::streaming::{content_type_for, parse_range, VideoStream};

/// Extensions kept on stored keys; anything else is stored as `.mp4`.
const KNOWN_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "avi", "m4v", "ogv"];

/// Client-supplied metadata of an uploaded file.
#[derive(Debug, Clone, Default)]
pub struct UploadMeta {
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// Create, list, stream and delete videos.
#[derive(Clone)]
pub struct VideoService {
    records: Arc<dyn RecordStore>,
    storage: Arc<dyn VideoStorage>,
    pipeline: IngestionPipeline,
}

impl VideoService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn VideoStorage>,
        pipeline: IngestionPipeline,
    ) -> Self {
        Self {
            records,
            storage,
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    pub fn ensure_can_upload(&self, caller: &Caller) -> ApiResult<()> {
        if access::can_write(caller) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Uploading requires the editor or admin role"))
        }
    }

    /// Store the upload, persist its record and start one ingestion run.
    ///
    /// Returns the record as created, before the pipeline touches it.
    pub async fn create_video(
        &self,
        caller: &Caller,
        upload: UploadMeta,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> ApiResult<VideoRecord> {
        self.ensure_can_upload(caller)?;

        if let Some(content_type) = upload.content_type.as_deref() {
            if !is_video_content_type(content_type) {
                return Err(ApiError::bad_request(format!(
                    "Unsupported content type: {}",
                    content_type
                )));
            }
        }

        let title = upload
            .filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("untitled")
            .to_string();
        let key = storage_key_for(&title);

        let size = match self.storage.save(&key, reader).await {
            Ok(size) => size,
            Err(StorageError::UploadFailed(msg)) => {
                return Err(ApiError::bad_request(format!("Upload interrupted: {}", msg)))
            }
            Err(e) => return Err(e.into()),
        };

        if size == 0 {
            self.discard_file(&key).await;
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }

        let record = VideoRecord::new(caller.id.clone(), title, key.clone(), size);
        let record = match self.records.create(record).await {
            Ok(record) => record,
            Err(e) => {
                self.discard_file(&key).await;
                return Err(e.into());
            }
        };

        metrics::record_upload(size);
        info!(
            video_id = %record.id,
            user_id = %caller.id,
            size = %format_bytes(size),
            "Video uploaded"
        );

        if let Err(e) = self.pipeline.start(record.id.clone()) {
            error!(video_id = %record.id, error = %e, "Failed to start ingestion");
        }

        Ok(record)
    }

    /// Admins see every record, everyone else their own. Newest first.
    pub async fn videos_for_caller(&self, caller: &Caller) -> ApiResult<Vec<VideoRecord>> {
        let filter = if caller.is_admin {
            ListFilter::all()
        } else {
            ListFilter::owned_by(caller.id.clone())
        };
        Ok(self.records.list(&filter).await?)
    }

    pub async fn all_videos(&self, caller: &Caller) -> ApiResult<Vec<VideoRecord>> {
        if !caller.is_admin {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(self.records.list(&ListFilter::all()).await?)
    }

    pub async fn get_video(&self, caller: &Caller, id: &VideoId) -> ApiResult<VideoRecord> {
        let record = self.find(id).await?;
        if !access::can_read(caller, &record) {
            return Err(ApiError::forbidden("You do not have access to this video"));
        }
        Ok(record)
    }

    /// Open the stored bytes for playback, honouring a `Range` header.
    pub async fn stream_video(
        &self,
        caller: &Caller,
        id: &VideoId,
        range_header: Option<&str>,
    ) -> ApiResult<VideoStream> {
        let record = self.get_video(caller, id).await?;

        let total = match self.storage.size(&record.storage_ref).await {
            Ok(size) => size,
            Err(StorageError::NotFound(_)) => {
                return Err(ApiError::not_found("Video file not found"))
            }
            Err(e) => return Err(e.into()),
        };

        let range = parse_range(range_header, total)?;
        let body = match self.storage.open(&record.storage_ref, range).await {
            Ok(body) => body,
            Err(StorageError::NotFound(_)) => {
                return Err(ApiError::not_found("Video file not found"))
            }
            Err(e) => return Err(e.into()),
        };

        metrics::record_stream(range.is_some());
        Ok(VideoStream {
            total,
            range,
            content_type: content_type_for(&record.storage_ref),
            body,
        })
    }

    /// Remove the stored file, then the record.
    pub async fn delete_video(&self, caller: &Caller, id: &VideoId) -> ApiResult<()> {
        let record = self.find(id).await?;
        if !access::can_manage(caller, &record) {
            return Err(ApiError::forbidden("You do not have access to this video"));
        }

        self.storage
            .delete(&record.storage_ref)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete video file: {}", e)))?;

        let removed = self
            .records
            .delete(&record.id)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete video record: {}", e)))?;
        if !removed {
            warn!(video_id = %record.id, "Record already gone at delete");
        }

        info!(video_id = %record.id, user_id = %caller.id, "Video deleted");
        Ok(())
    }

    async fn find(&self, id: &VideoId) -> ApiResult<VideoRecord> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Video not found"))
    }

    async fn discard_file(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            warn!(key = %key, error = %e, "Failed to remove stored upload");
        }
    }
}

fn is_video_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("video/") || mime == "application/octet-stream"
}

/// `<uuid>.<ext>`, keeping the extension only when it is a known video type.
fn storage_key_for(filename: &str) -> String {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "mp4".to_string());
    format!("{}.{}", VideoId::new(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_keeps_known_extension() {
        assert!(storage_key_for("Holiday.WEBM").ends_with(".webm"));
        assert!(storage_key_for("clip.mp4").ends_with(".mp4"));
        assert!(storage_key_for("../../etc/passwd").ends_with(".mp4"));
        assert!(storage_key_for("noext").ends_with(".mp4"));
        assert!(!storage_key_for("a/b.mov").contains('/'));
    }

    #[test]
    fn test_video_content_types() {
        assert!(is_video_content_type("video/mp4"));
        assert!(is_video_content_type("Video/WebM; codecs=vp9"));
        assert!(is_video_content_type("application/octet-stream"));
        assert!(!is_video_content_type("image/png"));
        assert!(!is_video_content_type("text/plain"));
    }
}
