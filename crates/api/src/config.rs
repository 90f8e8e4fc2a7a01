use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use storyshot_pipeline::clip_bin::DEFAULT_MERGE_WINDOW_SECS;
use storyshot_pipeline::conversion::{
    ConversionSettings, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
use storyshot_pipeline::reconcile::ReconcileSettings;
use storyshot_pipeline::StudioConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
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
    /// Remote clip store. Without it clips live in memory.
    pub database_url: Option<String>,
    /// Draft snapshot file.
    pub drafts_path: PathBuf,
    pub tts_url: String,
    pub conversion_url: String,
    pub lipsync_url: String,
    pub image_to_video_url: String,
    /// Timeout applied to every provider call (default: `300`).
    pub provider_timeout_secs: u64,
    pub conversion_poll_interval_ms: u64,
    pub conversion_max_polls: u32,
    pub merge_window_secs: i64,
    pub clip_list_limit: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `DATABASE_URL`                | unset (in-memory clips)    |
    /// | `DRAFTS_PATH`                 | `data/drafts.json`         |
    /// | `TTS_URL`                     | `http://localhost:8101`    |
    /// | `CONVERSION_URL`              | `http://localhost:8102`    |
    /// | `LIPSYNC_URL`                 | `http://localhost:8103`    |
    /// | `IMAGE_TO_VIDEO_URL`          | `http://localhost:8104`    |
    /// | `PROVIDER_TIMEOUT_SECS`       | `300`                      |
    /// | `CONVERSION_POLL_INTERVAL_MS` | `2000`                     |
    /// | `CONVERSION_MAX_POLLS`        | `300`                      |
    /// | `MERGE_WINDOW_SECS`           | `300`                      |
    /// | `CLIP_LIST_LIMIT`             | `100`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        let cors_origins = string_var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            host: string_var("HOST", "0.0.0.0"),
            port: parse_var("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", 30)?,
            database_url,
            drafts_path: PathBuf::from(string_var("DRAFTS_PATH", "data/drafts.json")),
            tts_url: string_var("TTS_URL", "http://localhost:8101"),
            conversion_url: string_var("CONVERSION_URL", "http://localhost:8102"),
            lipsync_url: string_var("LIPSYNC_URL", "http://localhost:8103"),
            image_to_video_url: string_var("IMAGE_TO_VIDEO_URL", "http://localhost:8104"),
            provider_timeout_secs: parse_var("PROVIDER_TIMEOUT_SECS", 300)?,
            conversion_poll_interval_ms: parse_var(
                "CONVERSION_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL.as_millis() as u64,
            )?,
            conversion_max_polls: parse_var("CONVERSION_MAX_POLLS", DEFAULT_MAX_POLL_ATTEMPTS)?,
            merge_window_secs: parse_var("MERGE_WINDOW_SECS", DEFAULT_MERGE_WINDOW_SECS)?,
            clip_list_limit: parse_var(
                "CLIP_LIST_LIMIT",
                storyshot_db::models::clip::DEFAULT_CLIP_LIMIT,
            )?,
        })
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Engine settings derived from this configuration.
    pub fn studio_config(&self) -> StudioConfig {
        StudioConfig {
            conversion: ConversionSettings {
                poll_interval: Duration::from_millis(self.conversion_poll_interval_ms),
                max_poll_attempts: self.conversion_max_polls,
                ..ConversionSettings::default()
            },
            reconcile: ReconcileSettings {
                merge_window: chrono::Duration::seconds(self.merge_window_secs),
                list_limit: self.clip_list_limit,
            },
        }
    }
}

fn string_var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
