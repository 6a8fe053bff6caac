use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DEFAULT_STORAGE_ROOT: &str = "/srv/wxresume";
pub const DEFAULT_DOWNLOAD_TTL: u64 = 300;
pub const DEFAULT_WORKER_POLL_SECS: u64 = 2;
pub const DEFAULT_REGEN_TIMEOUT_SECS: u64 = 600;

/// Application configuration loaded from environment variables.
/// Shared by the API server and the re-optimization worker.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_root: PathBuf,
    pub download_secret: String,
    /// Download ticket time-to-live in seconds.
    pub download_ttl: u64,
    /// Base URL used when building view/download links, no trailing slash.
    pub public_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub worker_poll_secs: u64,
    /// Regeneration pipeline command line; required by the worker binary only.
    pub regen_command: Option<String>,
    pub regen_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        Ok(Config {
            storage_root: PathBuf::from(env_or("WXRESUME_STORAGE_ROOT", DEFAULT_STORAGE_ROOT)),
            download_secret: require_env("WXRESUME_DOWNLOAD_SECRET")?,
            download_ttl: positive_or(
                std::env::var("WXRESUME_DOWNLOAD_TTL").ok(),
                DEFAULT_DOWNLOAD_TTL,
            ),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            worker_poll_secs: positive_or(
                std::env::var("WXRESUME_WORKER_POLL_SECS").ok(),
                DEFAULT_WORKER_POLL_SECS,
            ),
            regen_command: std::env::var("WXRESUME_REGEN_COMMAND").ok(),
            regen_timeout_secs: positive_or(
                std::env::var("WXRESUME_REGEN_TIMEOUT").ok(),
                DEFAULT_REGEN_TIMEOUT_SECS,
            ),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Lenient positive-integer parse: garbage or non-positive values fall back
/// to the default instead of failing startup.
fn positive_or(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
