//! Method declarations loaded from TOML
//!
//! ```toml
//! base_folder = "views"
//! cache = true
//!
//! [methods.greeting]
//! template = "greeting.slim"
//! mandatory = ["name"]
//! optional = { title = "Mr." }
//! layout = "wrap"
//!
//! [methods.badge]
//! inline = { slim = "span.badge = user.name" }
//! ```
//!
//! `base_folder` is resolved against the manifest's directory, and template
//! paths against the base folder. An `inline` table maps dialect tags to
//! sources; the first tag with a registered dialect is used.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::configurator::{Configurator, Signature};
use crate::error::{ConfigurationError, Result, SettingsError};
use crate::settings::Settings;
use crate::value::Value;

/// One `[methods.<name>]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MethodEntry {
    pub template: Option<PathBuf>,
    pub inline: Option<BTreeMap<String, String>>,
    pub mandatory: Vec<String>,
    pub optional: BTreeMap<String, Value>,
    pub layout: Option<String>,
}

impl MethodEntry {
    pub fn signature(&self) -> Signature {
        Signature {
            mandatory: self.mandatory.clone(),
            optional: self.optional.clone(),
            layout: self.layout.clone(),
        }
    }
}

/// A set of method declarations with their settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub base_folder: Option<PathBuf>,
    pub cache: Option<bool>,
    pub methods: BTreeMap<String, MethodEntry>,

    /// Directory of the manifest file
    #[serde(skip)]
    root: PathBuf,
}

impl Manifest {
    /// Load a manifest; relative paths resolve against its directory
    pub fn from_file(path: &Path) -> std::result::Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_str(&content)?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest.with_root(root))
    }

    /// Parse a manifest; relative paths resolve against the current directory
    pub fn from_str(content: &str) -> std::result::Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Effective settings, with the base folder resolved against the root
    pub fn settings(&self) -> Settings {
        let folder = match &self.base_folder {
            Some(folder) => self.root.join(folder),
            None => self.root.clone(),
        };
        Settings::new()
            .with_base_folder(folder)
            .with_cache(self.cache.unwrap_or(true))
    }

    /// Apply the settings and register every declared method.
    ///
    /// Stops at the first registration error; methods registered before it
    /// stay installed.
    pub fn apply<S>(&self, configurator: &mut Configurator<S>) -> Result<()> {
        configurator.apply_settings(&self.settings());

        for (name, entry) in &self.methods {
            match (&entry.template, &entry.inline) {
                (Some(path), None) => configurator.template(name.as_str(), path, entry.signature())?,
                (None, Some(sources)) => {
                    let (tag, source) = sources
                        .iter()
                        .find(|(tag, _)| configurator.dialects().is_registered(tag))
                        .ok_or_else(|| ConfigurationError::UnknownDialect {
                            tags: sources.keys().cloned().collect(),
                        })?;
                    configurator.template_inline(name.as_str(), tag, source, entry.signature())?
                }
                _ => {
                    return Err(ConfigurationError::AmbiguousTemplate { name: name.clone() }.into())
                }
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            methods = self.methods.len(),
            "applied manifest"
        );
        Ok(())
    }
}
