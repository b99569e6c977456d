//! Configuration resolution for the relaychat CLI.
//!
//! Precedence: `--config FILE`, then `config.toml` in the user's config
//! directory if it exists, then built-in defaults. `--server` overrides the
//! URL from whichever source was used.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use relaychat_client::ClientConfig;

/// Resolve the client configuration from command-line options.
pub fn load(path: Option<&Path>, server: Option<&str>) -> Result<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Could not load {}", path.display()))?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                tracing::debug!("Using config file {}", path.display());
                ClientConfig::from_file(&path)?
            }
            None => ClientConfig::default(),
        },
    };

    Ok(match server {
        Some(url) => config.with_server_url(url),
        None => config,
    })
}

/// `config.toml` in the platform config directory for relaychat.
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "relaychat", "relaychat")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nurl = \"http://relay.test:1234\"").unwrap();

        let config = load(Some(file.path()), None).unwrap();
        assert_eq!(config.server.url, "http://relay.test:1234");
    }

    #[test]
    fn server_flag_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nurl = \"http://relay.test:1234\"\n[poll]\ninterval_ms = 900").unwrap();

        let config = load(Some(file.path()), Some("http://other:80")).unwrap();
        assert_eq!(config.server.url, "http://other:80");
        assert_eq!(config.poll.interval_ms, 900);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.toml")), None).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read config file"));
    }
}
