//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Working directory: the source for `put`, the destination for `get`.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Seconds to wait for the TCP connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Body streaming buffer size in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_buffer_size() -> usize {
    ferry_transfer::DEFAULT_BUFFER_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            connect_timeout_secs: default_connect_timeout(),
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
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Applies command-line overrides.
    pub fn override_with(&mut self, dir: Option<PathBuf>, connect_timeout_secs: Option<u64>) {
        if let Some(dir) = dir {
            self.dir = dir;
        }
        if let Some(secs) = connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
