//! Axum HTTP/WS API server.
//!
//! This crate provides:
//! - Upload, listing, range streaming and deletion of videos
//! - HS256 bearer authentication and the owner-or-admin access rules
//! - A progress WebSocket fed by the ingestion pipeline
//! - Rate limiting, security headers and Prometheus metrics

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod streaming;
pub mod ws;

pub use auth::{AuthKeys, AuthUser, Claims};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{UploadMeta, VideoService};
pub use state::AppState;
