//! Install service
//!
//! Entry point for CLI and HTTP callers. Each operation is a sequential
//! pipeline: load the configuration document, talk to the catalog and the
//! installers, then persist the updated document once.

use crate::archive::{remove_if_exists, ArchiveInstaller, SkillArchiveRequest};
use crate::error::{ExtensionError, Result};
use crate::package::{NpmPackageInstaller, PackageInstallRequest, PackageInstaller};
use crate::sync::{SyncReconciler, SyncReport};
use chrono::{DateTime, Utc};
use quiver_catalog::{select_token, CatalogClient, CatalogError};
use quiver_core::ledger::{get_install, list_installs, record_install, remove_install};
use quiver_core::slots::{is_enabled, release_unit};
use quiver_core::types::{
    Catalog, ExtensionEntry, ExtensionInstallRecord, InstallRecord, InstallSection,
    ResolvedPaths, RuntimeConfig, SkillEntry, SkillInstallRecord, UnitKind, UnitType,
};
use quiver_core::utils::get_quiver_dir;
use quiver_core::{
    apply_selection, validate_unit_name, ConfigDocument, ConfigStore, RegisteredUnit, SlotWarning,
};
use quiver_fetch::GuardedFetcher;
use quiver_secrets::{AccessToken, CredentialResolver};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One installed unit with its drift against the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledUnit {
    pub unit_type: UnitType,
    pub id: String,
    pub version: String,
    /// Extension kind, when the catalog still lists it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<UnitKind>,
    pub enabled: bool,
    pub catalog_managed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_version: Option<String>,
    pub update_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

/// Result of [`InstallService::install`]
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub unit_type: UnitType,
    pub id: String,
    pub version: String,
    pub path: PathBuf,
    /// Units demoted from an exclusive slot
    pub warnings: Vec<SlotWarning>,
}

/// Result of [`InstallService::uninstall`]
#[derive(Debug, Clone)]
pub struct UninstallOutcome {
    pub unit_type: UnitType,
    pub id: String,
    /// Directory that was deleted, if one existed
    pub removed_path: Option<PathBuf>,
}

enum CatalogTarget<'a> {
    Extension(&'a ExtensionEntry),
    Skill(&'a SkillEntry),
}

pub struct InstallService {
    runtime: RuntimeConfig,
    paths: ResolvedPaths,
    store: ConfigStore,
    catalog: CatalogClient,
    credentials: CredentialResolver,
    archives: ArchiveInstaller,
    packages: Box<dyn PackageInstaller>,
}

impl InstallService {
    /// Build every collaborator from runtime settings
    pub fn from_runtime_config(runtime: RuntimeConfig) -> Result<Self> {
        let default_home = match &runtime.paths.home {
            Some(home) => home.clone(),
            None => get_quiver_dir()?,
        };
        let paths = runtime.paths.resolve(default_home);
        let network = &runtime.network;
        let fetcher = GuardedFetcher::from_network_config(network);

        Ok(Self {
            store: ConfigStore::new(&paths.config_file),
            catalog: CatalogClient::from_runtime_config(&runtime),
            credentials: CredentialResolver::from_runtime_config(&runtime),
            archives: ArchiveInstaller::from_network_config(fetcher, network),
            packages: Box::new(NpmPackageInstaller::new(Duration::from_secs(
                network.package_install_timeout_secs,
            ))),
            paths,
            runtime,
        })
    }

    /// Replace the fetcher used for catalog and archive downloads
    pub fn with_fetcher(mut self, fetcher: GuardedFetcher) -> Self {
        let network = &self.runtime.network;
        self.catalog = CatalogClient::new(
            fetcher.clone(),
            Duration::from_secs(network.http_timeout_secs),
        );
        self.archives = ArchiveInstaller::from_network_config(fetcher, network);
        self
    }

    pub fn with_package_installer(mut self, packages: Box<dyn PackageInstaller>) -> Self {
        self.packages = packages;
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialResolver) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    /// Registry URL from settings, else the one the catalog advertises
    pub fn registry_url(&self, catalog: Option<&Catalog>) -> Option<String> {
        self.runtime
            .marketplace
            .registry_url
            .clone()
            .or_else(|| catalog.and_then(|c| c.registry.clone()))
    }

    pub async fn fetch_catalog(&self) -> Result<Catalog> {
        let token = self.operation_token().await;
        self.fetch_catalog_with(token.as_ref()).await
    }

    async fn fetch_catalog_with(&self, token: Option<&AccessToken>) -> Result<Catalog> {
        let url = self
            .runtime
            .marketplace
            .catalog_url
            .as_deref()
            .ok_or(CatalogError::NotConfigured)?;
        Ok(self.catalog.fetch_catalog(url, token).await?)
    }

    /// Credential shared by every request of one operation
    async fn operation_token(&self) -> Option<AccessToken> {
        let marketplace = &self.runtime.marketplace;
        select_token(
            marketplace.auth_method,
            marketplace.effective_static_token(),
            &self.credentials,
        )
        .await
    }

    /// Every installed unit with its catalog drift.
    ///
    /// When the catalog cannot be fetched, units are still listed without
    /// catalog versions.
    pub async fn list_installed(&self) -> Result<Vec<InstalledUnit>> {
        let config = self.store.load()?;
        let catalog = match self.fetch_catalog().await {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                warn!("Catalog unavailable, listing without update info: {}", e);
                None
            }
        };
        Ok(installed_units(&config, catalog.as_ref())?)
    }

    /// Install `id` from the catalog.
    ///
    /// Without `unit_type` an extension with that id is preferred over a
    /// skill with that name.
    pub async fn install(&self, id: &str, unit_type: Option<UnitType>) -> Result<InstallOutcome> {
        validate_unit_name(type_label(unit_type), id)?;
        let config = self.store.load()?;
        let token = self.operation_token().await;
        let catalog = self.fetch_catalog_with(token.as_ref()).await?;

        let target = match unit_type {
            Some(UnitType::Extension) => catalog.extension(id).map(CatalogTarget::Extension),
            Some(UnitType::Skill) => catalog.skill(id).map(CatalogTarget::Skill),
            None => catalog
                .extension(id)
                .map(CatalogTarget::Extension)
                .or_else(|| catalog.skill(id).map(CatalogTarget::Skill)),
        }
        .ok_or_else(|| ExtensionError::NotFoundInCatalog {
            id: id.to_string(),
            unit_type: type_label(unit_type),
        })?;

        match target {
            CatalogTarget::Skill(entry) => self.install_skill(config, entry, token.as_ref()).await,
            CatalogTarget::Extension(entry) => {
                self.install_extension(config, &catalog, entry, token).await
            }
        }
    }

    async fn install_skill(
        &self,
        config: ConfigDocument,
        entry: &SkillEntry,
        token: Option<&AccessToken>,
    ) -> Result<InstallOutcome> {
        let archive_url = entry
            .archive_ref()
            .ok_or_else(|| ExtensionError::MissingReference {
                id: entry.name.clone(),
                unit_type: UnitType::Skill,
                reference: "archive URL",
            })?;

        let installed = self
            .archives
            .install_skill_from_archive(&SkillArchiveRequest {
                name: &entry.name,
                archive_url,
                managed_dir: &self.paths.skills_dir,
                token,
            })
            .await?;

        let config = record_install(
            &config,
            &entry.name,
            SkillInstallRecord::marketplace(entry.version.clone(), Some(archive_url.to_string())),
        )?;
        self.store.save(&config)?;

        Ok(InstallOutcome {
            unit_type: UnitType::Skill,
            id: entry.name.clone(),
            version: entry.version.clone(),
            path: installed.target_dir,
            warnings: Vec::new(),
        })
    }

    async fn install_extension(
        &self,
        config: ConfigDocument,
        catalog: &Catalog,
        entry: &ExtensionEntry,
        token: Option<AccessToken>,
    ) -> Result<InstallOutcome> {
        let spec = entry
            .package_ref()
            .ok_or_else(|| ExtensionError::MissingReference {
                id: entry.id.clone(),
                unit_type: UnitType::Extension,
                reference: "package spec",
            })?;

        let request = PackageInstallRequest {
            id: entry.id.clone(),
            spec: spec.to_string(),
            install_dir: self.paths.extensions_dir.join(&entry.id),
            registry_url: self.registry_url(Some(catalog)),
            token,
        };
        debug!("Installing extension '{}' with {}", entry.id, self.packages.name());
        let installed = self.packages.install(&request).await?;
        let path = installed.install_path.clone();

        let record = installed.into_record(spec, &entry.version, Utc::now());
        let config = record_install(&config, &entry.id, record)?;

        let registry = registered_extensions(&config, catalog)?;
        let selection = apply_selection(&config, &entry.id, entry.kind, &registry)?;
        for warning in &selection.warnings {
            warn!("{}", warning);
        }
        self.store.save(&selection.config)?;

        info!("Installed extension '{}' {}", entry.id, entry.version);
        Ok(InstallOutcome {
            unit_type: UnitType::Extension,
            id: entry.id.clone(),
            version: entry.version.clone(),
            path,
            warnings: selection.warnings,
        })
    }

    /// Remove an installed unit from disk and from the ledger
    pub async fn uninstall(&self, id: &str, unit_type: UnitType) -> Result<UninstallOutcome> {
        validate_unit_name(type_label(Some(unit_type)), id)?;
        let config = self.store.load()?;

        let (section, dir) = match unit_type {
            UnitType::Skill => {
                ensure_installed::<SkillInstallRecord>(&config, id, unit_type)?;
                (InstallSection::Skills, self.paths.skills_dir.join(id))
            }
            UnitType::Extension => {
                ensure_installed::<ExtensionInstallRecord>(&config, id, unit_type)?;
                (InstallSection::Extensions, self.paths.extensions_dir.join(id))
            }
        };

        let removed = tokio::task::spawn_blocking({
            let dir = dir.clone();
            move || remove_if_exists(&dir)
        })
        .await
        .map_err(|e| ExtensionError::io("Removal task failed", std::io::Error::other(e)))?
        .map_err(|e| ExtensionError::io(format!("Failed to remove {}", dir.display()), e))?;

        let mut config = remove_install(&config, section, id)?;
        if unit_type == UnitType::Extension {
            for kind in UnitKind::ALL.iter().filter(|k| k.is_exclusive()) {
                config = release_unit(&config, id, *kind)?;
            }
        }
        self.store.save(&config)?;

        info!("Uninstalled {} '{}'", unit_type, id);
        Ok(UninstallOutcome {
            unit_type,
            id: id.to_string(),
            removed_path: removed.then_some(dir),
        })
    }

    /// Bring catalog-managed units up to the catalog's versions
    pub async fn sync(&self) -> Result<SyncReport> {
        let config = self.store.load()?;
        let token = self.operation_token().await;
        let catalog = self.fetch_catalog_with(token.as_ref()).await?;
        let registry_url = self.registry_url(Some(&catalog));

        let reconciler = SyncReconciler {
            archives: &self.archives,
            packages: self.packages.as_ref(),
            skills_dir: &self.paths.skills_dir,
            extensions_dir: &self.paths.extensions_dir,
            registry_url: registry_url.as_deref(),
            token: token.as_ref(),
        };
        let report = reconciler.reconcile(&config, &catalog).await?;

        if report.changed {
            self.store.save(&report.config)?;
        }
        Ok(report)
    }

    /// Token the next operation would use, without exposing it
    pub async fn probe_token(&self) -> Option<(&'static str, AccessToken)> {
        self.credentials
            .resolve()
            .await
            .map(|resolved| (resolved.strategy, resolved.token))
    }
}

/// Join the ledger with the catalog
pub fn installed_units(
    config: &ConfigDocument,
    catalog: Option<&Catalog>,
) -> quiver_core::Result<Vec<InstalledUnit>> {
    let mut units = Vec::new();

    let extensions: Vec<(String, ExtensionInstallRecord)> = list_installs(config)?;
    for (id, record) in extensions {
        let entry = catalog.and_then(|c| c.extension(&id));
        units.push(unit(
            UnitType::Extension,
            &id,
            &record,
            entry.map(|e| e.version.as_str()),
            entry.map(|e| e.kind),
            is_enabled(config, &id),
        ));
    }

    let skills: Vec<(String, SkillInstallRecord)> = list_installs(config)?;
    for (name, record) in skills {
        let entry = catalog.and_then(|c| c.skill(&name));
        units.push(unit(
            UnitType::Skill,
            &name,
            &record,
            entry.map(|e| e.version.as_str()),
            None,
            true,
        ));
    }

    Ok(units)
}

fn unit<R: InstallRecord>(
    unit_type: UnitType,
    id: &str,
    record: &R,
    catalog_version: Option<&str>,
    kind: Option<UnitKind>,
    enabled: bool,
) -> InstalledUnit {
    let catalog_managed = record.is_catalog_managed();
    InstalledUnit {
        unit_type,
        id: id.to_string(),
        version: record.version().to_string(),
        kind,
        enabled,
        catalog_managed,
        catalog_version: catalog_version.map(str::to_string),
        update_available: catalog_managed
            && catalog_version.is_some_and(|v| v != record.version()),
        installed_at: record.installed_at(),
    }
}

/// Installed extensions whose kind the catalog knows
fn registered_extensions(
    config: &ConfigDocument,
    catalog: &Catalog,
) -> quiver_core::Result<Vec<RegisteredUnit>> {
    let installed: Vec<(String, ExtensionInstallRecord)> = list_installs(config)?;
    Ok(installed
        .into_iter()
        .filter_map(|(id, _)| {
            catalog
                .extension(&id)
                .map(|entry| RegisteredUnit::new(id, entry.kind))
        })
        .collect())
}

fn ensure_installed<R: InstallRecord>(
    config: &ConfigDocument,
    id: &str,
    unit_type: UnitType,
) -> Result<R> {
    get_install::<R>(config, id)?.ok_or_else(|| ExtensionError::NotInstalled {
        id: id.to_string(),
        unit_type,
    })
}

fn type_label(unit_type: Option<UnitType>) -> &'static str {
    match unit_type {
        Some(UnitType::Extension) => "extension",
        Some(UnitType::Skill) => "skill",
        None => "unit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog {
            version: 1,
            updated_at: None,
            registry: Some("https://npm.example/".to_string()),
            extensions: vec![ExtensionEntry {
                id: "memory-core".to_string(),
                name: "Memory".to_string(),
                description: String::new(),
                package_spec: Some("@acme/memory-core@2.0.0".to_string()),
                version: "2.0.0".to_string(),
                kind: UnitKind::Memory,
                tags: vec![],
            }],
            skills: vec![SkillEntry {
                name: "pdf".to_string(),
                description: String::new(),
                archive_url: None,
                version: "1.0.0".to_string(),
                tags: vec![],
            }],
        }
    }

    #[test]
    fn test_installed_units_report_drift() {
        let mut doc = record_install(
            &ConfigDocument::empty(),
            "memory-core",
            ExtensionInstallRecord::marketplace("@acme/memory-core@1.0.0", "/x", "1.0.0"),
        )
        .unwrap();
        doc = record_install(&doc, "pdf", SkillInstallRecord::marketplace("1.0.0", None)).unwrap();

        let units = installed_units(&doc, Some(&catalog())).unwrap();
        let memory = units.iter().find(|u| u.id == "memory-core").unwrap();
        assert!(memory.update_available);
        assert_eq!(memory.catalog_version.as_deref(), Some("2.0.0"));
        assert_eq!(memory.kind, Some(UnitKind::Memory));
        let pdf = units.iter().find(|u| u.id == "pdf").unwrap();
        assert!(!pdf.update_available);

        let offline = installed_units(&doc, None).unwrap();
        assert!(offline.iter().all(|u| !u.update_available));
    }

    #[test]
    fn test_type_label() {
        assert_eq!(type_label(None), "unit");
        assert_eq!(type_label(Some(UnitType::Skill)), "skill");
    }
}
