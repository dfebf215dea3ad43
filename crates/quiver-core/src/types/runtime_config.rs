//! Runtime configuration types for operational parameters
//!
//! These control where the catalog and registry live, how Quiver
//! authenticates against them, network limits and on-disk locations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Catalog and registry settings
    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,
}

/// How credentials for the catalog and registry are obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    /// Resolve a bearer token through the credential strategy chain
    DelegatedCredential,
    /// Use the configured static token
    StaticToken,
    /// Unauthenticated
    #[default]
    None,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::DelegatedCredential => write!(f, "delegated-credential"),
            AuthMethod::StaticToken => write!(f, "static-token"),
            AuthMethod::None => write!(f, "none"),
        }
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delegated-credential" => Ok(AuthMethod::DelegatedCredential),
            "static-token" => Ok(AuthMethod::StaticToken),
            "none" | "" => Ok(AuthMethod::None),
            other => Err(format!(
                "Unknown auth method '{}'. Valid methods: delegated-credential, static-token, none",
                other
            )),
        }
    }
}

/// Catalog and registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MarketplaceConfig {
    /// Catalog location (`https://` or `gs://bucket/path`)
    #[serde(default)]
    pub catalog_url: Option<String>,

    /// Package registry override; the catalog's `registry` is used otherwise
    #[serde(default)]
    pub registry_url: Option<String>,

    #[serde(default)]
    pub auth_method: AuthMethod,

    /// Used as-is with `static-token`, and as the last fallback of the
    /// `delegated-credential` chain
    #[serde(default, skip_serializing)]
    pub static_token: Option<String>,
}

impl MarketplaceConfig {
    /// Static token, if the auth method calls for one
    pub fn effective_static_token(&self) -> Option<&str> {
        match self.auth_method {
            AuthMethod::StaticToken => self.static_token.as_deref().filter(|t| !t.is_empty()),
            _ => None,
        }
    }
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Catalog fetch timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Archive download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Archive extraction timeout in seconds
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout_secs: u64,

    /// Instance metadata token request timeout in seconds
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,

    /// Local CLI credential helper timeout in seconds
    #[serde(default = "default_credential_helper_timeout")]
    pub credential_helper_timeout_secs: u64,

    /// Package installer timeout in seconds
    #[serde(default = "default_package_install_timeout")]
    pub package_install_timeout_secs: u64,

    /// Maximum redirect hops followed by the guarded fetcher
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Disable the private-address check entirely
    #[serde(default)]
    pub allow_private_network: bool,

    /// Hostnames exempt from the private-address check
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            extract_timeout_secs: default_extract_timeout(),
            metadata_timeout_secs: default_metadata_timeout(),
            credential_helper_timeout_secs: default_credential_helper_timeout(),
            package_install_timeout_secs: default_package_install_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            allow_private_network: false,
            allowed_hosts: Vec::new(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    120
}
fn default_extract_timeout() -> u64 {
    60
}
fn default_metadata_timeout() -> u64 {
    3
}
fn default_credential_helper_timeout() -> u64 {
    10
}
fn default_package_install_timeout() -> u64 {
    300 // 5 minutes
}
fn default_max_redirects() -> usize {
    5
}
fn default_user_agent() -> String {
    format!(
        "quiver/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Filesystem locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PathsConfig {
    /// State root; defaults to `~/.quiver`
    #[serde(default)]
    pub home: Option<PathBuf>,

    /// Managed skill directory; defaults to `<home>/skills`
    #[serde(default)]
    pub skills_dir: Option<PathBuf>,

    /// Extension install root; defaults to `<home>/extensions`
    #[serde(default)]
    pub extensions_dir: Option<PathBuf>,

    /// Configuration document; defaults to `<home>/quiver.json`
    #[serde(default)]
    pub config_file: Option<PathBuf>,
}

impl PathsConfig {
    /// Resolve every location against `default_home`
    pub fn resolve(&self, default_home: PathBuf) -> ResolvedPaths {
        let home = self.home.clone().unwrap_or(default_home);
        ResolvedPaths {
            skills_dir: self
                .skills_dir
                .clone()
                .unwrap_or_else(|| home.join("skills")),
            extensions_dir: self
                .extensions_dir
                .clone()
                .unwrap_or_else(|| home.join("extensions")),
            config_file: self
                .config_file
                .clone()
                .unwrap_or_else(|| home.join("quiver.json")),
            home,
        }
    }
}

/// Fully resolved filesystem locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub home: PathBuf,
    pub skills_dir: PathBuf,
    pub extensions_dir: PathBuf,
    pub config_file: PathBuf,
}
