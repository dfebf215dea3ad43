//! Sync of installed units against the catalog
//!
//! Only catalog-managed records take part. Per record:
//! - absent from the catalog: skipped, ledger untouched
//! - same version: unchanged, no network activity
//! - different version, no download reference: skipped
//! - different version with a reference: reinstalled; the ledger is updated
//!   on success and left as-is on failure

use crate::archive::{ArchiveInstaller, SkillArchiveRequest};
use crate::package::{PackageInstallRequest, PackageInstaller};
use quiver_core::ledger::{list_installs, record_install};
use quiver_core::types::{
    Catalog, ExtensionInstallRecord, InstallRecord, SkillInstallRecord, UnitType,
};
use quiver_core::ConfigDocument;
use quiver_secrets::AccessToken;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

const REASON_NOT_IN_CATALOG: &str = "no longer in catalog";
const REASON_NO_REFERENCE: &str = "no archive/package reference";

/// Classification of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncStatus {
    Unchanged { version: String },
    Updated { from: String, to: String },
    Skipped { reason: String },
    Errored { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub unit_type: UnitType,
    pub id: String,
    #[serde(flatten)]
    pub status: SyncStatus,
}

/// Every outcome, whether anything changed, and the resulting document.
///
/// Callers persist `config` only when `changed` is true.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
    pub changed: bool,
    #[serde(skip)]
    pub config: ConfigDocument,
}

impl SyncReport {
    pub fn count(&self, pred: impl Fn(&SyncStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Reinstalls catalog-managed units whose version drifted
pub struct SyncReconciler<'a> {
    pub archives: &'a ArchiveInstaller,
    pub packages: &'a dyn PackageInstaller,
    pub skills_dir: &'a Path,
    pub extensions_dir: &'a Path,
    pub registry_url: Option<&'a str>,
    pub token: Option<&'a AccessToken>,
}

impl SyncReconciler<'_> {
    pub async fn reconcile(
        &self,
        config: &ConfigDocument,
        catalog: &Catalog,
    ) -> quiver_core::Result<SyncReport> {
        let mut current = config.clone();
        let mut outcomes = Vec::new();
        let mut changed = false;

        let skills: Vec<(String, SkillInstallRecord)> = list_installs(config)?;
        for (name, record) in skills.into_iter().filter(|(_, r)| r.is_catalog_managed()) {
            let status = match catalog.skill(&name) {
                None => skipped(REASON_NOT_IN_CATALOG),
                Some(entry) if entry.version == record.version => SyncStatus::Unchanged {
                    version: record.version.clone(),
                },
                Some(entry) => match entry.archive_ref() {
                    None => skipped(REASON_NO_REFERENCE),
                    Some(archive_url) => {
                        let request = SkillArchiveRequest {
                            name: &name,
                            archive_url,
                            managed_dir: self.skills_dir,
                            token: self.token,
                        };
                        match self.archives.install_skill_from_archive(&request).await {
                            Ok(_) => {
                                current = record_install(
                                    &current,
                                    &name,
                                    SkillInstallRecord::marketplace(
                                        entry.version.clone(),
                                        Some(archive_url.to_string()),
                                    ),
                                )?;
                                changed = true;
                                updated(&record.version, &entry.version)
                            }
                            Err(e) => errored(UnitType::Skill, &name, e.to_string()),
                        }
                    }
                },
            };
            outcomes.push(outcome(UnitType::Skill, name, status));
        }

        let extensions: Vec<(String, ExtensionInstallRecord)> = list_installs(config)?;
        for (id, record) in extensions
            .into_iter()
            .filter(|(_, r)| r.is_catalog_managed())
        {
            let status = match catalog.extension(&id) {
                None => skipped(REASON_NOT_IN_CATALOG),
                Some(entry) if entry.version == record.version => SyncStatus::Unchanged {
                    version: record.version.clone(),
                },
                Some(entry) => match entry.package_ref() {
                    None => skipped(REASON_NO_REFERENCE),
                    Some(spec) => {
                        let request = PackageInstallRequest {
                            id: id.clone(),
                            spec: spec.to_string(),
                            install_dir: self.extensions_dir.join(&id),
                            registry_url: self.registry_url.map(str::to_string),
                            token: self.token.cloned(),
                        };
                        match self.packages.install(&request).await {
                            Ok(installed) => {
                                let new_record = installed.into_record(
                                    spec,
                                    &entry.version,
                                    chrono::Utc::now(),
                                );
                                current = record_install(&current, &id, new_record)?;
                                changed = true;
                                updated(&record.version, &entry.version)
                            }
                            Err(e) => errored(UnitType::Extension, &id, e.to_string()),
                        }
                    }
                },
            };
            outcomes.push(outcome(UnitType::Extension, id, status));
        }

        info!(
            "Sync finished: {} checked, {} updated",
            outcomes.len(),
            outcomes
                .iter()
                .filter(|o| matches!(o.status, SyncStatus::Updated { .. }))
                .count()
        );

        Ok(SyncReport {
            outcomes,
            changed,
            config: current,
        })
    }
}

fn outcome(unit_type: UnitType, id: String, status: SyncStatus) -> SyncOutcome {
    debug!("sync {} '{}': {:?}", unit_type, id, status);
    SyncOutcome {
        unit_type,
        id,
        status,
    }
}

fn skipped(reason: &str) -> SyncStatus {
    SyncStatus::Skipped {
        reason: reason.to_string(),
    }
}

fn updated(from: &str, to: &str) -> SyncStatus {
    SyncStatus::Updated {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn errored(unit_type: UnitType, id: &str, message: String) -> SyncStatus {
    warn!("Failed to update {} '{}': {}", unit_type, id, message);
    SyncStatus::Errored { message }
}
