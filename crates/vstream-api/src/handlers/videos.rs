//! Video handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use futures_util::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use vstream_models::{VideoId, VideoRecord};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::UploadMeta;
use crate::state::AppState;
use crate::streaming::VideoStream;

/// Multipart field carrying the file.
const UPLOAD_FIELD: &str = "video";

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Upload a video (editor/admin only).
pub async fn upload_video(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoRecord>> {
    state.videos.ensure_can_upload(&caller)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let upload = UploadMeta {
            filename: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
        };
        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        tokio::pin!(reader);

        let record = state.videos.create_video(&caller, upload, &mut reader).await?;
        return Ok(Json(record));
    }

    Err(ApiError::bad_request("No video file provided"))
}

/// List the caller's videos (everything for admins), newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<Vec<VideoRecord>>> {
    Ok(Json(state.videos.videos_for_caller(&caller).await?))
}

/// List every video (admin only).
pub async fn list_all_videos(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<Vec<VideoRecord>>> {
    Ok(Json(state.videos.all_videos(&caller).await?))
}

pub async fn get_video(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoRecord>> {
    let id = VideoId::from_string(video_id);
    Ok(Json(state.videos.get_video(&caller, &id).await?))
}

/// Stream the stored file with HTTP range support.
pub async fn stream_video(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<VideoStream> {
    let range = headers
        .get(header::RANGE)
        .map(|v| {
            v.to_str()
                .map_err(|_| ApiError::bad_request("Malformed Range header"))
        })
        .transpose()?;

    let id = VideoId::from_string(video_id);
    state.videos.stream_video(&caller, &id, range).await
}

pub async fn delete_video(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = VideoId::from_string(video_id);
    state.videos.delete_video(&caller, &id).await?;

    Ok(Json(MessageResponse {
        message: "Video deleted successfully".to_string(),
    }))
}
