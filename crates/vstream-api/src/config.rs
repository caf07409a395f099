//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Rate limit burst
    pub rate_limit_burst: u32,
    /// Max JSON request body size
    pub max_body_size: usize,
    /// Max multipart upload size
    pub max_upload_size: usize,
    /// Root directory for stored uploads
    pub upload_dir: PathBuf,
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Lifetime of issued tokens
    pub jwt_ttl: Duration,
    /// Admin login credentials; admin login is disabled unless both are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Expose /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 20,
            rate_limit_burst: 40,
            max_body_size: 1024 * 1024,         // 1MB
            max_upload_size: 500 * 1024 * 1024, // 500MB
            upload_dir: PathBuf::from("./uploads"),
            jwt_secret: String::new(),
            jwt_ttl: Duration::from_secs(168 * 3600),
            admin_email: None,
            admin_password: None,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            rate_limit_burst: std::env::var("RATE_LIMIT_BURST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(40),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500 * 1024 * 1024),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./uploads")),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            jwt_ttl: Duration::from_secs(
                std::env::var("JWT_TTL_HOURS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(168)
                    * 3600,
            ),
            admin_email: std::env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            admin_password: std::env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    pub fn admin_login_enabled(&self) -> bool {
        self.admin_email.is_some() && self.admin_password.is_some()
    }
}
