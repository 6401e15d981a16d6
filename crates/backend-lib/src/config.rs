// ============================
// puzzlee-realtime/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "puzzlee.toml";
/// Prefix for environment overrides, e.g. `PUZZLEE_BIND_ADDR`
pub const ENV_PREFIX: &str = "PUZZLEE_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Origins allowed to open HTTP requests from a browser; empty allows any
    pub cors_allowed_origins: Vec<String>,
    /// Largest client frame accepted on the WebSocket
    pub max_frame_bytes: usize,
    /// Broadcasts queued per connection before further ones are dropped for it
    pub outbox_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            cors_allowed_origins: Vec::new(),
            max_frame_bytes: 64 * 1024,
            outbox_capacity: 256,
        }
    }
}

impl Settings {
    /// Load settings: defaults, then `puzzlee.toml` (or `path`), then `PUZZLEE_*` env vars
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "unknown log level `{}`",
                self.log_level
            )));
        }
        if self.max_frame_bytes == 0 {
            return Err(AppError::Config("max_frame_bytes must be positive".to_string()));
        }
        if self.outbox_capacity == 0 {
            return Err(AppError::Config("outbox_capacity must be positive".to_string()));
        }
        Ok(())
    }
}
