//! # Configuration
//!
//! Runtime settings for the service and the YouTube client.
//!
//! Values come from command-line flags, falling back to environment
//! variables (`YT_API_KEY`, `WATCHSKIP_MODEL`, `WATCHSKIP_HOST`,
//! `WATCHSKIP_PORT`, `YOUTUBE_API_BASE`). A `.env` file in the working
//! directory is loaded before flags are parsed.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Public YouTube Data API v3 endpoint.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Default location of the trained model.
pub const DEFAULT_MODEL_PATH: &str = "models/watchskip.model";

/// Default location of the generated dataset.
pub const DEFAULT_DATASET_PATH: &str = "data/youtube_dataset.csv";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// Per-request timeout against the YouTube API.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of looking for a `.env` file.
#[derive(Debug)]
pub enum DotenvStatus {
    Loaded(PathBuf),
    Missing,
    Invalid(String),
}

/// Load `.env` into the process environment without overriding set variables.
pub fn load_dotenv() -> DotenvStatus {
    match dotenvy::dotenv() {
        Ok(path) => DotenvStatus::Loaded(path),
        Err(e) if e.not_found() => DotenvStatus::Missing,
        Err(e) => DotenvStatus::Invalid(e.to_string()),
    }
}

/// YouTube Data API access.
#[derive(Clone)]
pub struct YouTubeConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl YouTubeConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// The key must not end up in logs.
impl fmt::Debug for YouTubeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YouTubeConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Settings for `serve`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub youtube: YouTubeConfig,
}

impl ServerConfig {
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let config = YouTubeConfig::new("super-secret-key");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let config = ServerConfig {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            model_path: DEFAULT_MODEL_PATH.into(),
            youtube: YouTubeConfig::new("k"),
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
    }

    #[test]
    fn base_url_override() {
        let config = YouTubeConfig::new("k").with_base_url("http://localhost:9999");
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
