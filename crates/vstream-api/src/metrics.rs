//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vstream_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vstream_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vstream_http_requests_in_flight";

    // WebSocket metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "vstream_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "vstream_ws_connections_active";
    pub const WS_MESSAGES_SENT: &str = "vstream_ws_messages_sent_total";

    // Video metrics
    pub const UPLOADS_TOTAL: &str = "vstream_uploads_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "vstream_upload_bytes_total";
    pub const STREAM_REQUESTS_TOTAL: &str = "vstream_stream_requests_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vstream_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a new WebSocket connection and bump the active gauge.
pub fn record_ws_connected(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::WS_CONNECTIONS_TOTAL, &labels).increment(1);
    gauge!(names::WS_CONNECTIONS_ACTIVE).increment(1.0);
}

pub fn record_ws_disconnected() {
    gauge!(names::WS_CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record WebSocket message sent.
pub fn record_ws_message_sent(endpoint: &str, message_type: &str) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("type", message_type.to_string()),
    ];
    counter!(names::WS_MESSAGES_SENT, &labels).increment(1);
}

/// Record an accepted upload.
pub fn record_upload(size_bytes: u64) {
    counter!(names::UPLOADS_TOTAL).increment(1);
    counter!(names::UPLOAD_BYTES_TOTAL).increment(size_bytes);
}

/// Record a stream response, partial or full.
pub fn record_stream(partial: bool) {
    let kind = if partial { "partial" } else { "full" };
    counter!(names::STREAM_REQUESTS_TOTAL, "kind" => kind).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

fn uuid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("valid uuid pattern")
    })
}

fn video_segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/videos/([a-zA-Z0-9_-]+)").expect("valid video segment pattern")
    })
}

/// Sanitize path for metrics labels (remove IDs).
fn sanitize_path(path: &str) -> String {
    let path = uuid_pattern().replace_all(path, ":id");
    video_segment_pattern()
        .replace_all(&path, |caps: &regex_lite::Captures| match &caps[1] {
            "all" | "upload" | ":id" => caps[0].to_string(),
            _ => "/videos/:id".to_string(),
        })
        .into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/videos/550e8400-e29b-41d4-a716-446655440000/stream"),
            "/api/videos/:id/stream"
        );
        assert_eq!(sanitize_path("/api/videos/abc_123"), "/api/videos/:id");
        assert_eq!(sanitize_path("/api/videos/all"), "/api/videos/all");
        assert_eq!(sanitize_path("/api/videos/upload"), "/api/videos/upload");
    }
}
