//! Registration settings
//!
//! Settings only affect methods registered after they are applied.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SettingsError;

/// Base folder and caching policy for template registration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Folder template paths are resolved against; the current directory
    /// when unset
    pub base_folder: Option<PathBuf>,

    /// Compile file templates once at registration instead of on every call
    pub cache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_folder: None,
            cache: true,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_base_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.base_folder = Some(folder.into());
        self
    }

    pub fn without_base_folder(mut self) -> Self {
        self.base_folder = None;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}
