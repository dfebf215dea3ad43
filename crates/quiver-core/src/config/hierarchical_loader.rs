//! Hierarchical configuration loader with precedence
//!
//! Loads runtime configuration from multiple sources with the following
//! precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User runtime config (~/.quiver/runtime.yaml, or an explicit path)
//! 3. Environment variables (QUIVER_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::{AuthMethod, RuntimeConfig};
use crate::utils::get_quiver_dir;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// File name of the user runtime config inside the config directory
const RUNTIME_CONFIG_FILE: &str = "runtime.yaml";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at `$QUIVER_HOME` or `~/.quiver`
    pub fn new() -> Result<Self> {
        let dir = get_quiver_dir()?;
        let config_dir = Utf8PathBuf::from_path_buf(dir)
            .map_err(|p| Error::invalid_config(format!("Non UTF-8 config dir: {}", p.display())))?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let path = self.config_dir.join(RUNTIME_CONFIG_FILE);
        self.load_with_file(&path, false)
    }

    /// Load runtime configuration using an explicit user file.
    ///
    /// Unlike the default location, an explicit file must exist.
    pub fn load_runtime_config_from(&self, path: &Utf8Path) -> Result<RuntimeConfig> {
        self.load_with_file(path, true)
    }

    fn load_with_file(&self, path: &Utf8Path, required: bool) -> Result<RuntimeConfig> {
        let mut config = Self::load_embedded_config::<RuntimeConfig>("runtime-defaults.yaml")?;

        if path.exists() {
            debug!("Loading runtime config from {}", path);
            let file_config = self.load_yaml_file::<RuntimeConfig>(path)?;
            config = Self::merge_runtime_config(config, file_config);
        } else if required {
            return Err(Error::config_not_found(path.as_str()));
        }

        self.apply_env_overrides(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Merge two runtime configs (base is overridden by overlay)
    fn merge_runtime_config(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
        let mut paths = base.paths;
        if overlay.paths.home.is_some() {
            paths.home = overlay.paths.home;
        }
        if overlay.paths.skills_dir.is_some() {
            paths.skills_dir = overlay.paths.skills_dir;
        }
        if overlay.paths.extensions_dir.is_some() {
            paths.extensions_dir = overlay.paths.extensions_dir;
        }
        if overlay.paths.config_file.is_some() {
            paths.config_file = overlay.paths.config_file;
        }

        RuntimeConfig {
            marketplace: overlay.marketplace,
            network: overlay.network,
            paths,
        }
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(&self, mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Ok(val) = env::var("QUIVER_CATALOG_URL") {
            config.marketplace.catalog_url = Some(val);
        }

        if let Ok(val) = env::var("QUIVER_REGISTRY_URL") {
            config.marketplace.registry_url = Some(val);
        }

        if let Ok(val) = env::var("QUIVER_AUTH_METHOD") {
            config.marketplace.auth_method = val
                .parse::<AuthMethod>()
                .map_err(|e| Error::invalid_config(format!("QUIVER_AUTH_METHOD: {}", e)))?;
        }

        if let Ok(val) = env::var("QUIVER_STATIC_TOKEN") {
            config.marketplace.static_token = Some(val);
        }

        if let Ok(val) = env::var("QUIVER_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("QUIVER_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("QUIVER_DOWNLOAD_TIMEOUT_SECS") {
            config.network.download_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("QUIVER_DOWNLOAD_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("QUIVER_ALLOW_PRIVATE_NETWORK") {
            config.network.allow_private_network = matches!(val.as_str(), "1" | "true" | "yes");
        }

        if let Ok(val) = env::var("QUIVER_HOME") {
            if !val.is_empty() {
                config.paths.home = Some(val.into());
            }
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
