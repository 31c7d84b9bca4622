//! Persistent filter values
//!
//! A small key-value store kept as a JSON object on disk, holding string
//! values the way browser local storage does. The last-used filter lives
//! under [`FILTER_STORAGE_KEY`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use kdlogs_types::{FilterConfig, FILTER_STORAGE_KEY};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to encode storage: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key-value store backed by a JSON file
#[derive(Debug)]
pub struct FilterStore {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FilterStore {
    /// Default store location under the home directory
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".kdlogs").join("storage.json"))
    }

    /// Open the store at `path`; a missing or unreadable file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt storage file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read storage file");
                BTreeMap::new()
            }
        };
        Self { path, items }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    pub fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_string(), value);
    }

    /// Write the store back to disk
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(&self.items)?;
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Last saved filter, or an empty one when nothing usable is stored
    pub fn load_filter(&self) -> FilterConfig {
        let raw = self.get_item(FILTER_STORAGE_KEY).unwrap_or("{}");
        serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring stored filter that does not parse");
            FilterConfig::default()
        })
    }

    /// Store the filter and persist the store
    pub fn save_filter(&mut self, filter: &FilterConfig) -> Result<(), StoreError> {
        let raw = serde_json::to_string(filter)?;
        self.set_item(FILTER_STORAGE_KEY, raw);
        self.save()
    }
}
