//! Registry-backed extension installs
//!
//! Package resolution and download are delegated to the package manager.
//! The default [`NpmPackageInstaller`] runs
//! `npm install --prefix <install_dir> --no-save [--registry <url>] <spec>`
//! with the registry auth environment, then reads what npm resolved from the
//! install tree.

use crate::error::{ExtensionError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiver_core::types::ExtensionInstallRecord;
use quiver_secrets::{build_registry_auth_env, AccessToken};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// What to install and where
#[derive(Debug, Clone)]
pub struct PackageInstallRequest {
    /// Extension id (already validated)
    pub id: String,
    /// Package reference, e.g. `@acme/memory-lance@1.4.0`
    pub spec: String,
    /// Directory owned by this extension
    pub install_dir: PathBuf,
    pub registry_url: Option<String>,
    pub token: Option<AccessToken>,
}

impl PackageInstallRequest {
    /// Arguments for `npm install`
    pub fn npm_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "install".into(),
            "--prefix".into(),
            self.install_dir.clone().into_os_string(),
            "--no-save".into(),
            "--no-fund".into(),
            "--no-audit".into(),
        ];
        if let Some(registry) = &self.registry_url {
            args.push("--registry".into());
            args.push(registry.into());
        }
        args.push(self.spec.clone().into());
        args
    }

    /// Environment handed to the package manager
    pub fn auth_env(&self) -> BTreeMap<String, String> {
        match (&self.registry_url, &self.token) {
            (Some(registry), Some(token)) => build_registry_auth_env(registry, token),
            _ => BTreeMap::new(),
        }
    }
}

/// What the package manager actually installed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInstallOutcome {
    pub install_path: PathBuf,
    pub resolved_name: Option<String>,
    pub resolved_version: Option<String>,
    pub resolved_spec: Option<String>,
    pub integrity: Option<String>,
    pub shasum: Option<String>,
}

impl PackageInstallOutcome {
    /// Catalog-sourced install record for this outcome
    pub fn into_record(
        self,
        spec: &str,
        version: &str,
        resolved_at: DateTime<Utc>,
    ) -> ExtensionInstallRecord {
        let mut record = ExtensionInstallRecord::marketplace(
            spec,
            self.install_path.display().to_string(),
            version,
        );
        record.resolved_name = self.resolved_name;
        record.resolved_version = self.resolved_version;
        record.resolved_spec = self.resolved_spec;
        record.integrity = self.integrity;
        record.shasum = self.shasum;
        record.resolved_at = Some(resolved_at);
        record
    }
}

/// Installs registry packages on behalf of the engine
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    async fn install(&self, request: &PackageInstallRequest) -> Result<PackageInstallOutcome>;

    /// Installer name for logs
    fn name(&self) -> &'static str;
}

/// `npm`-backed installer
pub struct NpmPackageInstaller {
    program: String,
    timeout: Duration,
}

impl NpmPackageInstaller {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "npm".to_string(),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl PackageInstaller for NpmPackageInstaller {
    async fn install(&self, request: &PackageInstallRequest) -> Result<PackageInstallOutcome> {
        let failed = |message: String| ExtensionError::PackageInstall {
            spec: request.spec.clone(),
            message,
        };

        let program = which::which(&self.program)
            .map_err(|_| failed(format!("{} not found on PATH", self.program)))?;

        tokio::fs::create_dir_all(&request.install_dir)
            .await
            .map_err(|e| {
                ExtensionError::io(
                    format!("Failed to create {}", request.install_dir.display()),
                    e,
                )
            })?;

        info!("Installing {} via {}...", request.spec, self.program);
        let mut cmd = Command::new(program);
        cmd.args(request.npm_args())
            .envs(request.auth_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| failed(format!("failed to spawn {}: {}", self.program, e)))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(failed(format!("failed to wait for {}: {}", self.program, e))),
            Err(_) => {
                return Err(failed(format!(
                    "{} install timed out after {:?}",
                    self.program, self.timeout
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "{} install exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let outcome = read_install_tree(&request.install_dir, &request.spec);
        debug!(
            "Resolved {} to {:?}@{:?}",
            request.spec, outcome.resolved_name, outcome.resolved_version
        );
        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "npm"
    }
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(rename = "_shasum")]
    shasum: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HiddenLockfile {
    #[serde(default)]
    packages: BTreeMap<String, LockEntry>,
}

#[derive(Debug, Deserialize)]
struct LockEntry {
    resolved: Option<String>,
    integrity: Option<String>,
}

/// Read resolution details from `<prefix>/node_modules`.
///
/// Missing or unreadable files leave the corresponding fields empty.
pub fn read_install_tree(install_dir: &Path, spec: &str) -> PackageInstallOutcome {
    let name = package_name(spec);
    let package_dir = install_dir.join("node_modules").join(name);

    let manifest: Option<PackageManifest> = std::fs::read_to_string(package_dir.join("package.json"))
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok());

    let lock: Option<HiddenLockfile> =
        std::fs::read_to_string(install_dir.join("node_modules").join(".package-lock.json"))
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());
    let lock_entry = lock.and_then(|mut l| l.packages.remove(&format!("node_modules/{}", name)));

    let (resolved_name, resolved_version, shasum) = match manifest {
        Some(m) => (m.name, m.version, m.shasum),
        None => (None, None, None),
    };
    let resolved_spec = match (&resolved_name, &resolved_version) {
        (Some(n), Some(v)) => Some(format!("{}@{}", n, v)),
        _ => None,
    };
    let (resolved, integrity) = match lock_entry {
        Some(entry) => (entry.resolved, entry.integrity),
        None => (None, None),
    };

    PackageInstallOutcome {
        install_path: package_dir,
        resolved_name,
        resolved_version,
        resolved_spec: resolved_spec.or(resolved),
        integrity,
        shasum,
    }
}

/// Package name part of a spec: `@scope/pkg@1.0.0` -> `@scope/pkg`
pub fn package_name(spec: &str) -> &str {
    let spec = spec.trim();
    let search_from = usize::from(spec.starts_with('@'));
    match spec[search_from..].find('@') {
        Some(idx) => &spec[..search_from + idx],
        None => spec,
    }
}
