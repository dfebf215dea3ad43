//! The persisted configuration document.
//!
//! Quiver owns only a few sub-trees of this document (`plugins.installs`,
//! `skills.installs`, `plugins.entries.*.enabled`, `plugins.slots`). Every
//! other field is carried through untouched, in its original key order.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Immutable JSON configuration value.
///
/// Operations that change the document take `&self` and return a new value;
/// the receiver is never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigDocument(Value);

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl ConfigDocument {
    /// An empty `{}` document
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Wrap an existing JSON value; the root must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::invalid_document("root must be a JSON object"));
        }
        Ok(Self(value))
    }

    /// Parse a document from JSON text
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Look up a nested value by object keys
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.0, |value, key| value.as_object()?.get(*key))
    }

    /// Root object, for crate-internal copy-on-write edits
    pub(crate) fn root(&self) -> &Map<String, Value> {
        match &self.0 {
            Value::Object(map) => map,
            // from_value/parse/empty only ever build objects
            _ => unreachable!("configuration document root is always an object"),
        }
    }

    pub(crate) fn from_root(root: Map<String, Value>) -> Self {
        Self(Value::Object(root))
    }

    /// Pretty JSON text with a trailing newline
    pub fn to_pretty_string(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.0)?;
        text.push('\n');
        Ok(text)
    }
}

/// Loads and saves the configuration document on disk.
///
/// There is no cross-process locking: concurrent writers race and the
/// last `save` wins.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; a missing file is an empty document
    pub fn load(&self) -> Result<ConfigDocument> {
        if !self.path.exists() {
            debug!(
                "Config document {} does not exist, starting empty",
                self.path.display()
            );
            return Ok(ConfigDocument::empty());
        }

        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(ConfigDocument::empty());
        }
        ConfigDocument::parse(&text)
    }

    /// Replace the document on disk (temp file + rename in the same directory)
    pub fn save(&self, document: &ConfigDocument) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::invalid_config("Config document path has no file name"))?;
        let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(document.to_pretty_string()?.as_bytes())?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!("Saved config document to {}", self.path.display());
        Ok(())
    }
}
