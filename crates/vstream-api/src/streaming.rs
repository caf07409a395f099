//! HTTP byte-range streaming of stored videos.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use vstream_storage::{ByteRange, ByteStream};

use crate::error::{ApiError, ApiResult};

/// Parse a `Range` header against an object of `size` bytes.
///
/// Only a single `bytes=<start>-<end?>` interval is accepted. An end past the
/// last byte is clamped; a start past it is rejected.
pub fn parse_range(header: Option<&str>, size: u64) -> ApiResult<Option<ByteRange>> {
    let Some(raw) = header else {
        return Ok(None);
    };

    let interval = raw
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported range unit: {}", raw)))?;

    if interval.contains(',') {
        return Err(ApiError::bad_request("Multiple ranges are not supported"));
    }

    let (start, end) = interval
        .split_once('-')
        .ok_or_else(|| ApiError::bad_request(format!("Malformed range: {}", raw)))?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return Err(ApiError::bad_request("Range start is required"));
    }
    let start: u64 = start
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Malformed range start: {}", start)))?;

    let end: u64 = if end.is_empty() {
        size.saturating_sub(1)
    } else {
        end.parse()
            .map_err(|_| ApiError::bad_request(format!("Malformed range end: {}", end)))?
    };

    if start > end {
        return Err(ApiError::bad_request(format!(
            "Range start {} is after end {}",
            start, end
        )));
    }
    if start >= size {
        return Err(ApiError::bad_request(format!(
            "Range start {} is beyond file size {}",
            start, size
        )));
    }

    Ok(ByteRange::new(start, end.min(size - 1)))
}

/// MIME type from the stored file extension.
pub fn content_type_for(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "m4v" => "video/x-m4v",
        "ogv" => "video/ogg",
        _ => "video/mp4",
    }
}

/// A stored video ready to be written to the response.
pub struct VideoStream {
    pub total: u64,
    pub range: Option<ByteRange>,
    pub content_type: &'static str,
    pub body: ByteStream,
}

impl VideoStream {
    pub fn is_partial(&self) -> bool {
        self.range.is_some()
    }

    pub fn content_length(&self) -> u64 {
        self.range.map(|r| r.len()).unwrap_or(self.total)
    }
}

impl std::fmt::Debug for VideoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStream")
            .field("total", &self.total)
            .field("range", &self.range)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl IntoResponse for VideoStream {
    fn into_response(self) -> Response {
        let status = if self.is_partial() {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };
        let content_length = self.content_length();

        let mut response = Response::new(Body::from_stream(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("private, max-age=3600"),
        );
        // Players on another origin need to embed the stream
        headers.insert(
            "cross-origin-resource-policy",
            HeaderValue::from_static("cross-origin"),
        );
        if let Some(range) = self.range {
            if let Ok(value) = HeaderValue::from_str(&range.content_range(self.total)) {
                headers.insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, end: u64) -> Option<ByteRange> {
        ByteRange::new(start, end)
    }

    #[test]
    fn test_no_header_is_full_response() {
        assert_eq!(parse_range(None, 1000).unwrap(), None);
    }

    #[test]
    fn test_closed_and_open_ranges() {
        assert_eq!(parse_range(Some("bytes=0-99"), 1000).unwrap(), range(0, 99));
        assert_eq!(parse_range(Some("bytes=500-"), 1000).unwrap(), range(500, 999));
        assert_eq!(parse_range(Some("bytes=999-999"), 1000).unwrap(), range(999, 999));
    }

    #[test]
    fn test_end_is_clamped() {
        assert_eq!(parse_range(Some("bytes=900-5000"), 1000).unwrap(), range(900, 999));
    }

    #[test]
    fn test_rejected_ranges() {
        for bad in [
            "bytes=1000-",
            "bytes=1500-1600",
            "bytes=100-50",
            "bytes=-500",
            "bytes=0-10,20-30",
            "bytes=abc-10",
            "bytes=0-x",
            "items=0-10",
            "bytes=10",
        ] {
            assert!(
                matches!(parse_range(Some(bad), 1000), Err(ApiError::BadRequest(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_any_range_on_empty_file_is_rejected() {
        assert!(parse_range(Some("bytes=0-"), 0).is_err());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("abc.webm"), "video/webm");
        assert_eq!(content_type_for("abc.MOV"), "video/quicktime");
        assert_eq!(content_type_for("abc.mp4"), "video/mp4");
        assert_eq!(content_type_for("abc"), "video/mp4");
    }
}
