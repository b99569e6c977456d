//! Configuration loading for relaychat clients.
//!
//! Configuration is loaded from a TOML file. Every field has a default, so
//! an empty file (or no file at all) yields a working configuration.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use relaychat_core::RetryPolicy;

/// Root configuration for a relaychat client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Relay server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Retry configuration for every request.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Message poller configuration.
    #[serde(default)]
    pub poll: PollConfig,
    /// Session behaviour.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Relay server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the relay's HTTP endpoints (default: http://127.0.0.1:8080).
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Timeout for a single request attempt in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry in milliseconds (default: 100).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Multiplier applied after each failure (default: 2).
    #[serde(default = "default_growth_factor")]
    pub growth_factor: u32,
    /// Upper bound on a single delay in milliseconds (default: none).
    pub max_delay_ms: Option<u64>,
}

/// Poller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Poll period in milliseconds (default: 250).
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Record messages shown in the open conversation as seen (default: true).
    #[serde(default = "default_auto_mark_seen")]
    pub auto_mark_seen: bool,
}

// Default value functions
fn default_server_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_growth_factor() -> u32 {
    2
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_auto_mark_seen() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            growth_factor: default_growth_factor(),
            max_delay_ms: None,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_mark_seen: default_auto_mark_seen(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Override the server URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server.url = url.into();
        self
    }

    /// Retry policy built from the `[retry]` section.
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(Duration::from_millis(self.retry.base_delay_ms))
            .with_growth_factor(self.retry.growth_factor);
        match self.retry.max_delay_ms {
            Some(max) => policy.with_max_delay(Duration::from_millis(max)),
            None => policy,
        }
    }

    /// Poll period.
    pub fn poll_interval(&self) -> Duration {
        // tokio::time::interval panics on a zero period
        Duration::from_millis(self.poll.interval_ms.max(1))
    }

    /// Per-attempt request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.server.url, "http://127.0.0.1:8080");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.retry.base_delay_ms, 100);
        assert_eq!(config.retry.growth_factor, 2);
        assert!(config.retry.max_delay_ms.is_none());
        assert_eq!(config.poll.interval_ms, 250);
        assert!(config.session.auto_mark_seen);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
url = "https://relay.example.org"
request_timeout_secs = 5

[retry]
base_delay_ms = 50
growth_factor = 3
max_delay_ms = 10000

[poll]
interval_ms = 1000

[session]
auto_mark_seen = false
"#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.url, "https://relay.example.org");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(!config.session.auto_mark_seen);

        let policy = config.retry_policy();
        assert_eq!(policy.base_delay, Duration::from_millis(50));
        assert_eq!(policy.growth_factor, 3);
        assert_eq!(policy.max_delay, Some(Duration::from_secs(10)));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let toml = r#"
[server]
url = "http://10.0.0.2:9000"
[retry]
"#;
        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.retry.base_delay_ms, 100);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let toml = "[poll]\ninterval_ms = 0\n";
        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn server_url_override() {
        let config = ClientConfig::default().with_server_url("http://other:1");
        assert_eq!(config.server.url, "http://other:1");
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poll]\ninterval_ms = 500").unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.poll.interval_ms, 500);
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn from_file_invalid_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poll]\ninterval_ms = \"fast\"").unwrap();

        let err = ClientConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("failed to parse config file"));
    }
}
