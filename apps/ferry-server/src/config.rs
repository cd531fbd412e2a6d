//! Server configuration.
//!
//! Values come from an optional TOML file; command-line arguments override
//! whatever the file sets.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// TCP port (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory uploads are stored in and downloads served from.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Body streaming buffer size in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    0
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_buffer_size() -> usize {
    ferry_transfer::DEFAULT_BUFFER_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            dir: default_dir(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Config {
    /// Loads the file at `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn override_with(&mut self, port: Option<u16>, dir: Option<PathBuf>, bind: Option<String>) {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(dir) = dir {
            self.dir = dir;
        }
        if let Some(bind) = bind {
            self.bind = bind;
        }
    }

    /// `bind:port` string handed to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert_eq!(config.dir, PathBuf::from("."));
        assert_eq!(config.buffer_size, 256 * 1024);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            bind: "127.0.0.1".into(),
            port: 9000,
            dir: PathBuf::from("/srv/files"),
            buffer_size: 4096,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.bind, "127.0.0.1");
        assert_eq!(parsed.port, 9000);
        assert_eq!(parsed.dir, PathBuf::from("/srv/files"));
        assert_eq!(parsed.buffer_size, 4096);
    }

    #[test]
    fn config_partial_toml() {
        let config: Config = toml::from_str("port = 7070").unwrap();
        assert_eq!(config.port, 7070);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.dir, PathBuf::from("."));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.port, 0);
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("server.toml");
        std::fs::write(&path, "port = 8123\ndir = \"/data\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.dir, PathBuf::from("/data"));
    }

    #[test]
    fn load_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&tmp.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn cli_overrides_file() {
        let mut config = Config {
            port: 1,
            ..Config::default()
        };
        config.override_with(Some(2), Some(PathBuf::from("/tmp/x")), None);

        assert_eq!(config.port, 2);
        assert_eq!(config.dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.listen_addr(), "0.0.0.0:2");
    }
}
