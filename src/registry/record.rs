use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::layout::{LOCK_FILENAME, MAP_FILENAME};
use crate::{Error, Result};

/// Plugin assigned to connections registered without one.
pub const DEFAULT_PLUGIN: &str = "default";

fn default_plugin() -> String {
    DEFAULT_PLUGIN.to_string()
}

/// The persisted part of a connection: what the map and the per-connection
/// file hold. Attachments live only in the storage directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub name: String,
    #[serde(default = "default_plugin")]
    pub plugin: String,
    pub command: String,
}

/// A connection as submitted for registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub name: String,
    pub command: String,
    pub plugin: String,
    /// Absolute paths of the files to copy into storage.
    pub attachments: Vec<PathBuf>,
}

impl ConnectionRecord {
    /// Create a record using the default plugin and no attachments.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            plugin: default_plugin(),
            attachments: Vec::new(),
        }
    }

    /// Set the plugin; `None` or an empty name keeps the default.
    pub fn with_plugin(mut self, plugin: Option<String>) -> Self {
        self.plugin = plugin
            .filter(|p| !p.is_empty())
            .unwrap_or_else(default_plugin);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }

    /// The part of the record that gets persisted.
    pub fn spec(&self) -> ConnectionSpec {
        ConnectionSpec {
            name: self.name.clone(),
            plugin: self.plugin.clone(),
            command: self.command.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }
}

/// What `describe` reports about a stored connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDetails {
    pub spec: ConnectionSpec,
    pub storage: PathBuf,
    pub attachments: Vec<PathBuf>,
}

/// Check that a name can serve as a storage directory name.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else if name.contains(['/', '\\', '\0']) {
        Some("name contains a path separator")
    } else if name == MAP_FILENAME || name == LOCK_FILENAME {
        Some("name is reserved by the registry")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Serialize the single-entry document stored at `<name>/<name>`.
pub(crate) fn record_to_toml(spec: &ConnectionSpec) -> Result<String> {
    let mut doc = BTreeMap::new();
    doc.insert(spec.name.as_str(), spec);
    toml::to_string(&doc).map_err(|e| Error::Serialize(e.to_string()))
}

/// Parse a per-connection file.
pub(crate) fn record_from_toml(content: &str, path: &Path) -> Result<ConnectionSpec> {
    let doc: BTreeMap<String, ConnectionSpec> =
        toml::from_str(content).map_err(|e| Error::RecordParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    doc.into_values().next().ok_or_else(|| Error::RecordParse {
        path: path.to_path_buf(),
        reason: "file holds no connection".to_string(),
    })
}

/// Parse the connection map, keyed by connection name.
pub(crate) fn map_from_toml(
    content: &str,
    path: &Path,
) -> Result<FxHashMap<String, ConnectionSpec>> {
    toml::from_str(content).map_err(|e| Error::MapParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
