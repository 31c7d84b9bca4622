use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use kdlogs_core::Markup;

/// Class marking the element that wraps each log line on the page
pub const DEFAULT_CONTAINER_CLASS: &str = "kd-logs-element";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unknown markup '{0}' (expected html, ansi or plain)")]
    Markup(String),
}

/// Settings read from `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output template used when none is given on the command line
    pub format: Option<String>,

    /// Marker style: html, ansi or plain
    pub markup: Option<String>,

    /// Class of the elements that hold log lines in HTML snapshots
    pub container_class: Option<String>,

    /// Location of the filter store
    pub storage_path: Option<PathBuf>,
}

impl Config {
    /// Default config location under the home directory
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".kdlogs").join("config.toml"))
    }

    /// Load the config. An explicit path must exist; the default path is
    /// optional and an absent file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve the markup, letting `flag` override the config value
    pub fn markup(&self, flag: Option<&str>) -> Result<Markup, ConfigError> {
        match flag.or(self.markup.as_deref()) {
            Some(name) => Markup::from_name(name).ok_or_else(|| ConfigError::Markup(name.to_string())),
            None => Ok(Markup::default()),
        }
    }

    pub fn container_class(&self) -> &str {
        self.container_class
            .as_deref()
            .unwrap_or(DEFAULT_CONTAINER_CLASS)
    }
}
