//! Integration tests for the `quiver` binary
//!
//! Every run gets its own `QUIVER_HOME` and no catalog, so nothing here
//! touches the network.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const QUIVER_ENV: [&str; 6] = [
    "QUIVER_CATALOG_URL",
    "QUIVER_REGISTRY_URL",
    "QUIVER_AUTH_METHOD",
    "QUIVER_STATIC_TOKEN",
    "QUIVER_ALLOW_PRIVATE_NETWORK",
    "QUIVER_HTTP_TIMEOUT_SECS",
];

fn quiver(home: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_quiver"));
    for var in QUIVER_ENV {
        cmd.env_remove(var);
    }
    cmd.env("QUIVER_HOME", home).args(args).output().unwrap()
}

#[test]
fn test_installed_json_is_empty_for_fresh_home() {
    let home = TempDir::new().unwrap();
    let out = quiver(home.path(), &["--quiet", "installed", "--json"]);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let units: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(units, serde_json::json!([]));
}

#[test]
fn test_sync_without_catalog_fails() {
    let home = TempDir::new().unwrap();
    let out = quiver(home.path(), &["--quiet", "sync"]);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("catalog"));
}

#[test]
fn test_uninstall_unknown_unit_fails() {
    let home = TempDir::new().unwrap();
    let out = quiver(home.path(), &["--quiet", "uninstall", "pdf", "--type", "skill"]);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not installed"));
    assert!(!home.path().join("quiver.json").exists());
}

#[test]
fn test_install_rejects_traversal_name() {
    let home = TempDir::new().unwrap();
    let out = quiver(home.path(), &["--quiet", "install", "../escape"]);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.yaml");
    let out = quiver(
        home.path(),
        &["--config", missing.to_str().unwrap(), "installed"],
    );

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("runtime settings"));
}

#[test]
fn test_verbose_logs_runtime_settings() {
    let home = TempDir::new().unwrap();
    let out = quiver(
        home.path(),
        &["-v", "--catalog-url", "http://127.0.0.1:9/catalog.json", "installed", "--json"],
    );

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Catalog URL overridden on the command line"), "stderr: {}", stderr);
    assert!(stderr.contains("Runtime settings: auth method"), "stderr: {}", stderr);
}
