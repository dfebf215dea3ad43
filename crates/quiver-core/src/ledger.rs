//! Install ledger
//!
//! Pure read-modify-write functions over the install-record collections of a
//! [`ConfigDocument`]. Nothing here performs I/O; callers persist the
//! returned document themselves. The input document is never modified.
//!
//! Records are keyed by extension id (`plugins.installs`) or skill name
//! (`skills.installs`). There is no history: the last write for a key wins.

use crate::config::ConfigDocument;
use crate::error::{Error, Result};
use crate::types::{InstallRecord, InstallSection};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Upsert `record` under `key`.
///
/// `installedAt` is taken from the record when present, otherwise carried
/// over from the existing entry, otherwise set to now.
pub fn record_install<R: InstallRecord>(
    config: &ConfigDocument,
    key: &str,
    record: R,
) -> Result<ConfigDocument> {
    record_install_at(config, key, record, Utc::now())
}

/// [`record_install`] with an explicit clock
pub fn record_install_at<R: InstallRecord>(
    config: &ConfigDocument,
    key: &str,
    mut record: R,
    now: DateTime<Utc>,
) -> Result<ConfigDocument> {
    let section = R::SECTION;
    let mut root = config.root().clone();
    let mut parent = object_at(&root, section.parent_key(), &section.to_string())?;
    let mut installs = object_at(&parent, section.installs_key(), &section.to_string())?;

    if record.installed_at().is_none() {
        let previous = installs
            .get(key)
            .and_then(|entry| entry.get("installedAt"))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        record.set_installed_at(previous.unwrap_or(now));
    }

    installs.insert(key.to_string(), serde_json::to_value(&record)?);
    parent.insert(section.installs_key().to_string(), Value::Object(installs));
    root.insert(section.parent_key().to_string(), Value::Object(parent));

    debug!("Recorded install {}[{}]", section, key);
    Ok(ConfigDocument::from_root(root))
}

/// Delete the record under `key`.
///
/// Deleting a missing key returns an equal document. When the collection
/// becomes empty the `installs` field is removed, and the parent object is
/// removed too if nothing else is left in it.
pub fn remove_install(
    config: &ConfigDocument,
    section: InstallSection,
    key: &str,
) -> Result<ConfigDocument> {
    let mut root = config.root().clone();
    let mut parent = object_at(&root, section.parent_key(), &section.to_string())?;
    let mut installs = object_at(&parent, section.installs_key(), &section.to_string())?;

    if installs.shift_remove(key).is_none() {
        return Ok(config.clone());
    }

    if installs.is_empty() {
        parent.shift_remove(section.installs_key());
    } else {
        parent.insert(section.installs_key().to_string(), Value::Object(installs));
    }

    if parent.is_empty() {
        root.shift_remove(section.parent_key());
    } else {
        root.insert(section.parent_key().to_string(), Value::Object(parent));
    }

    debug!("Removed install {}[{}]", section, key);
    Ok(ConfigDocument::from_root(root))
}

/// Look up a single record
pub fn get_install<R: InstallRecord>(config: &ConfigDocument, key: &str) -> Result<Option<R>> {
    let section = R::SECTION;
    match config.get_path(&[section.parent_key(), section.installs_key(), key]) {
        Some(value) => decode_record(section, key, value).map(Some),
        None => Ok(None),
    }
}

/// All records of one flavour, in document order
pub fn list_installs<R: InstallRecord>(config: &ConfigDocument) -> Result<Vec<(String, R)>> {
    let section = R::SECTION;
    let Some(installs) = config.get_path(&[section.parent_key(), section.installs_key()]) else {
        return Ok(Vec::new());
    };
    let installs = installs
        .as_object()
        .ok_or_else(|| Error::invalid_document(format!("`{}` must be an object", section)))?;

    installs
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_record(section, key, value)?)))
        .collect()
}

fn decode_record<R: InstallRecord>(section: InstallSection, key: &str, value: &Value) -> Result<R> {
    serde_json::from_value(value.clone())
        .map_err(|e| Error::invalid_document(format!("{}.{}: {}", section, key, e)))
}

/// Clone the object stored under `key`, or an empty object when absent
fn object_at(map: &Map<String, Value>, key: &str, context: &str) -> Result<Map<String, Value>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(obj)) => Ok(obj.clone()),
        Some(_) => Err(Error::invalid_document(format!(
            "`{}` must be an object (while updating {})",
            key, context
        ))),
    }
}
