//! CLI command implementations

pub mod auth;
pub mod catalog;
pub mod install;
pub mod installed;
pub mod sync;
pub mod uninstall;

use anyhow::{Context as _, Result};
use camino::Utf8PathBuf;
use quiver_core::types::RuntimeConfig;
use quiver_core::HierarchicalConfigLoader;
use quiver_extensions::InstallService;
use tracing::debug;

/// Settings shared by every command
pub struct Context {
    config_path: Option<Utf8PathBuf>,
    catalog_url: Option<String>,
}

impl Context {
    pub fn new(config_path: Option<Utf8PathBuf>, catalog_url: Option<String>) -> Self {
        Self {
            config_path,
            catalog_url,
        }
    }

    /// Runtime settings with command-line flags applied last
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        let loader =
            HierarchicalConfigLoader::new().context("Failed to locate the Quiver directory")?;
        let mut config = match &self.config_path {
            Some(path) => loader
                .load_runtime_config_from(path)
                .with_context(|| format!("Failed to load runtime settings from {}", path))?,
            None => loader
                .load_runtime_config()
                .context("Failed to load runtime settings")?,
        };

        if let Some(url) = &self.catalog_url {
            debug!("Catalog URL overridden on the command line: {}", url);
            config.marketplace.catalog_url = Some(url.clone());
        }
        debug!(
            "Runtime settings: auth method {}, catalog {:?}",
            config.marketplace.auth_method, config.marketplace.catalog_url
        );
        Ok(config)
    }

    pub fn service(&self) -> Result<InstallService> {
        InstallService::from_runtime_config(self.runtime_config()?)
            .context("Failed to initialize install service")
    }
}
