//! Ledger and slot state persisted through `ConfigStore`
//!
//! Covers the full read-modify-write cycle a caller performs: load, apply
//! ledger and slot changes, save, reload.

use chrono::{TimeZone, Utc};
use quiver_core::ledger::{get_install, list_installs, record_install_at, remove_install};
use quiver_core::slots::{is_enabled, release_unit, slot_holder};
use quiver_core::types::{
    ExtensionInstallRecord, InstallSection, SkillInstallRecord, UnitKind,
};
use quiver_core::{apply_selection, ConfigStore, RegisteredUnit};
use serde_json::json;
use tempfile::TempDir;

fn store_with(contents: &str) -> (ConfigStore, TempDir) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("quiver.json");
    std::fs::write(&path, contents).unwrap();
    (ConfigStore::new(path), temp)
}

#[test]
fn test_unrelated_settings_survive_install_and_removal() {
    let (store, _temp) = store_with(
        r#"{"theme": "dark", "plugins": {"allow": ["slack"]}, "skills": {"paths": ["/opt/skills"]}}"#,
    );
    let at = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();

    let doc = store.load().unwrap();
    let doc = record_install_at(
        &doc,
        "memory-lance",
        ExtensionInstallRecord::marketplace("@acme/memory-lance@1.4.0", "/x/memory-lance", "1.4.0"),
        at,
    )
    .unwrap();
    let doc = record_install_at(
        &doc,
        "pdf",
        SkillInstallRecord::marketplace("1.0.0", Some("https://example.com/pdf.tgz".into())),
        at,
    )
    .unwrap();
    store.save(&doc).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, doc);
    assert_eq!(reloaded.get_path(&["theme"]), Some(&json!("dark")));
    assert_eq!(
        reloaded.get_path(&["plugins", "installs", "memory-lance", "installedAt"]),
        Some(&json!("2026-10-01T09:00:00Z"))
    );

    let doc = remove_install(&reloaded, InstallSection::Skills, "pdf").unwrap();
    let doc = remove_install(&doc, InstallSection::Extensions, "memory-lance").unwrap();
    store.save(&doc).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(
        reloaded.as_value(),
        &json!({"theme": "dark", "plugins": {"allow": ["slack"]}, "skills": {"paths": ["/opt/skills"]}})
    );
}

#[test]
fn test_reinstall_keeps_original_install_time() {
    let (store, _temp) = store_with("");
    let first = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

    let doc = record_install_at(
        &store.load().unwrap(),
        "pdf",
        SkillInstallRecord::marketplace("1.0.0", None),
        first,
    )
    .unwrap();
    let doc = record_install_at(&doc, "pdf", SkillInstallRecord::marketplace("1.1.0", None), later)
        .unwrap();

    let record: SkillInstallRecord = get_install(&doc, "pdf").unwrap().unwrap();
    assert_eq!(record.version, "1.1.0");
    assert_eq!(record.installed_at, Some(first));

    let all: Vec<(String, SkillInstallRecord)> = list_installs(&doc).unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn test_memory_slot_handover_and_release() {
    let (store, _temp) = store_with("{}");
    let registry = vec![
        RegisteredUnit::new("memory-core", UnitKind::Memory),
        RegisteredUnit::new("memory-lance", UnitKind::Memory),
        RegisteredUnit::new("slack", UnitKind::Channel),
    ];

    let doc = store.load().unwrap();
    let first = apply_selection(&doc, "memory-core", UnitKind::Memory, &registry).unwrap();
    assert!(first.warnings.is_empty());

    let second =
        apply_selection(&first.config, "memory-lance", UnitKind::Memory, &registry).unwrap();
    assert_eq!(second.warnings.len(), 1);
    assert_eq!(second.warnings[0].demoted_id, "memory-core");
    store.save(&second.config).unwrap();

    let doc = store.load().unwrap();
    assert_eq!(slot_holder(&doc, "memory"), Some("memory-lance"));
    assert!(!is_enabled(&doc, "memory-core"));
    assert!(is_enabled(&doc, "slack"));

    let released = release_unit(&doc, "memory-lance", UnitKind::Memory).unwrap();
    assert_eq!(slot_holder(&released, "memory"), None);
    assert!(!is_enabled(&released, "memory-core"));
}

#[test]
fn test_non_exclusive_kind_leaves_document_alone() {
    let (store, _temp) = store_with(r#"{"plugins": {"entries": {"slack": {"enabled": false}}}}"#);
    let doc = store.load().unwrap();
    let registry = vec![RegisteredUnit::new("discord", UnitKind::Channel)];

    let selection = apply_selection(&doc, "discord", UnitKind::Channel, &registry).unwrap();
    assert_eq!(selection.config, doc);
    assert!(selection.warnings.is_empty());
}
