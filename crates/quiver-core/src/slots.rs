//! Exclusive slot resolution
//!
//! Some unit kinds (currently memory providers) may only have one enabled
//! instance. Selecting a unit of such a kind disables every other enabled
//! unit of the same kind and reports each demotion as a [`SlotWarning`].
//!
//! State lives in the configuration document:
//! - `plugins.entries.<id>.enabled` (absent means enabled)
//! - `plugins.slots.<slot>` holds the id of the current slot owner

use crate::config::ConfigDocument;
use crate::error::{Error, Result};
use crate::types::UnitKind;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info};

const PLUGINS_KEY: &str = "plugins";
const ENTRIES_KEY: &str = "entries";
const SLOTS_KEY: &str = "slots";
const ENABLED_KEY: &str = "enabled";

/// A unit known to the caller, with its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUnit {
    pub id: String,
    pub kind: UnitKind,
}

impl RegisteredUnit {
    pub fn new(id: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Non-fatal conflict produced when a competitor is demoted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWarning {
    pub slot: &'static str,
    pub kind: UnitKind,
    /// Unit that was disabled
    pub demoted_id: String,
    /// Unit that now holds the slot
    pub selected_id: String,
}

impl fmt::Display for SlotWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Disabled {} \"{}\": \"{}\" now holds the exclusive \"{}\" slot",
            self.kind.label(),
            self.demoted_id,
            self.selected_id,
            self.slot
        )
    }
}

/// Result of [`apply_selection`]
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSelection {
    pub config: ConfigDocument,
    pub warnings: Vec<SlotWarning>,
}

/// Select `selected_id` as the enabled unit of `selected_kind`.
///
/// Non-exclusive kinds return the document unchanged. `registry` lists the
/// units that may compete for the slot; units of other kinds are ignored.
pub fn apply_selection(
    config: &ConfigDocument,
    selected_id: &str,
    selected_kind: UnitKind,
    registry: &[RegisteredUnit],
) -> Result<SlotSelection> {
    let Some(slot) = selected_kind.exclusive_slot() else {
        return Ok(SlotSelection {
            config: config.clone(),
            warnings: Vec::new(),
        });
    };

    let mut root = config.root().clone();
    let mut plugins = object_at(&root, PLUGINS_KEY)?;
    let mut entries = object_at(&plugins, ENTRIES_KEY)?;
    let mut slots = object_at(&plugins, SLOTS_KEY)?;
    let mut warnings = Vec::new();

    for unit in registry
        .iter()
        .filter(|u| u.kind == selected_kind && u.id != selected_id)
    {
        if !entry_enabled(&entries, &unit.id) {
            continue;
        }
        set_enabled(&mut entries, &unit.id, false)?;
        let warning = SlotWarning {
            slot,
            kind: selected_kind,
            demoted_id: unit.id.clone(),
            selected_id: selected_id.to_string(),
        };
        info!("{}", warning);
        warnings.push(warning);
    }

    set_enabled(&mut entries, selected_id, true)?;
    slots.insert(slot.to_string(), Value::String(selected_id.to_string()));

    plugins.insert(ENTRIES_KEY.to_string(), Value::Object(entries));
    plugins.insert(SLOTS_KEY.to_string(), Value::Object(slots));
    root.insert(PLUGINS_KEY.to_string(), Value::Object(plugins));

    debug!(
        "Slot '{}' assigned to '{}' ({} demoted)",
        slot,
        selected_id,
        warnings.len()
    );

    Ok(SlotSelection {
        config: ConfigDocument::from_root(root),
        warnings,
    })
}

/// Drop slot state for a unit that is being uninstalled.
///
/// Clears `plugins.slots.<slot>` when `id` holds it and removes the
/// `enabled` flag from its entry. Empty containers left behind are removed.
pub fn release_unit(config: &ConfigDocument, id: &str, kind: UnitKind) -> Result<ConfigDocument> {
    let mut root = config.root().clone();
    let mut plugins = object_at(&root, PLUGINS_KEY)?;
    let mut entries = object_at(&plugins, ENTRIES_KEY)?;
    let mut slots = object_at(&plugins, SLOTS_KEY)?;

    if let Some(slot) = kind.exclusive_slot() {
        if slots.get(slot).and_then(Value::as_str) == Some(id) {
            slots.shift_remove(slot);
        }
    }

    if let Some(Value::Object(entry)) = entries.get_mut(id) {
        entry.shift_remove(ENABLED_KEY);
        if entry.is_empty() {
            entries.shift_remove(id);
        }
    }

    put_or_prune(&mut plugins, ENTRIES_KEY, entries);
    put_or_prune(&mut plugins, SLOTS_KEY, slots);
    put_or_prune(&mut root, PLUGINS_KEY, plugins);

    Ok(ConfigDocument::from_root(root))
}

/// Whether a unit is enabled (absent entries default to enabled)
pub fn is_enabled(config: &ConfigDocument, id: &str) -> bool {
    config
        .get_path(&[PLUGINS_KEY, ENTRIES_KEY, id, ENABLED_KEY])
        .and_then(Value::as_bool)
        .unwrap_or(true)
}

/// Current owner of an exclusive slot
pub fn slot_holder<'a>(config: &'a ConfigDocument, slot: &str) -> Option<&'a str> {
    config
        .get_path(&[PLUGINS_KEY, SLOTS_KEY, slot])
        .and_then(Value::as_str)
}

fn entry_enabled(entries: &Map<String, Value>, id: &str) -> bool {
    entries
        .get(id)
        .and_then(|e| e.get(ENABLED_KEY))
        .and_then(Value::as_bool)
        .unwrap_or(true)
}

fn set_enabled(entries: &mut Map<String, Value>, id: &str, enabled: bool) -> Result<()> {
    let entry = entries
        .entry(id.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match entry {
        Value::Object(obj) => {
            obj.insert(ENABLED_KEY.to_string(), Value::Bool(enabled));
            Ok(())
        }
        _ => Err(Error::invalid_document(format!(
            "`plugins.entries.{}` must be an object",
            id
        ))),
    }
}

fn put_or_prune(map: &mut Map<String, Value>, key: &str, value: Map<String, Value>) {
    if value.is_empty() {
        map.shift_remove(key);
    } else {
        map.insert(key.to_string(), Value::Object(value));
    }
}

fn object_at(map: &Map<String, Value>, key: &str) -> Result<Map<String, Value>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(obj)) => Ok(obj.clone()),
        Some(_) => Err(Error::invalid_document(format!(
            "`{}` must be an object",
            key
        ))),
    }
}
