use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL and JWT secret have defaults suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Body limit for CSV uploads in bytes (default: 50 MiB).
    pub max_upload_bytes: usize,
    /// `lock_timeout` for claim, submit and return transactions.
    pub claim_lock_timeout_ms: u64,
    /// Interval of the abandoned-assignment sweep (default: `300`).
    pub expiry_interval_secs: u64,
    /// Whether results exports include worker columns unless the request
    /// says otherwise (default: `true`).
    pub export_worker_identity: bool,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `3000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `MAX_UPLOAD_BYTES`       | `52428800`              |
    /// | `CLAIM_LOCK_TIMEOUT_MS`  | `5000`                  |
    /// | `EXPIRY_INTERVAL_SECS`   | `300`                   |
    /// | `EXPORT_WORKER_IDENTITY` | `true`                  |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = env_or("MAX_UPLOAD_BYTES", "52428800")
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let claim_lock_timeout_ms: u64 = env_or("CLAIM_LOCK_TIMEOUT_MS", "5000")
            .parse()
            .expect("CLAIM_LOCK_TIMEOUT_MS must be a valid u64");

        let expiry_interval_secs: u64 = env_or("EXPIRY_INTERVAL_SECS", "300")
            .parse()
            .expect("EXPIRY_INTERVAL_SECS must be a valid u64");
        assert!(expiry_interval_secs > 0, "EXPIRY_INTERVAL_SECS must be positive");

        let export_worker_identity: bool = env_or("EXPORT_WORKER_IDENTITY", "true")
            .parse()
            .expect("EXPORT_WORKER_IDENTITY must be true or false");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes,
            claim_lock_timeout_ms,
            expiry_interval_secs,
            export_worker_identity,
            jwt: JwtConfig::from_env(),
        }
    }

    pub fn claim_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.claim_lock_timeout_ms)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
