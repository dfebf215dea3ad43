//! Error types for quiver-extensions

use quiver_catalog::CatalogError;
use quiver_core::types::UnitType;
use quiver_core::ErrorClass;
use quiver_fetch::FetchError;
use thiserror::Error;

/// Result type alias using quiver-extensions' error type
pub type Result<T> = std::result::Result<T, ExtensionError>;

#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error(transparent)]
    Core(#[from] quiver_core::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Archive server answered with a non-success status
    #[error("Failed to download {url}: HTTP {status} {reason}")]
    DownloadFailed {
        url: String,
        status: u16,
        reason: String,
    },

    /// Archive extracted but the marker file is missing
    #[error("Archive for '{name}' is not a valid skill package: {marker} not found at its root")]
    InvalidSkillPackage { name: String, marker: &'static str },

    /// Archive entry would land outside the staging directory
    #[error("Unsafe archive entry '{path}': absolute paths and '..' are not allowed")]
    UnsafeArchiveEntry { path: String },

    #[error("Archive entry '{path}' is {size} bytes, over the {limit} byte limit")]
    ArchiveEntryTooLarge { path: String, size: u64, limit: u64 },

    #[error("Failed to extract archive: {message}")]
    Extraction { message: String },

    #[error("Archive extraction timed out after {timeout_ms}ms")]
    ExtractionTimeout { timeout_ms: u128 },

    /// Package-manager subprocess failed
    #[error("Failed to install package {spec}: {message}")]
    PackageInstall { spec: String, message: String },

    #[error("{unit_type} '{id}' not found in catalog")]
    NotFoundInCatalog {
        id: String,
        unit_type: &'static str,
    },

    #[error("{unit_type} '{id}' has no {reference} in the catalog")]
    MissingReference {
        id: String,
        unit_type: UnitType,
        reference: &'static str,
    },

    #[error("{unit_type} '{id}' is not installed")]
    NotInstalled { id: String, unit_type: UnitType },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExtensionError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ExtensionError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        ExtensionError::Extraction {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            ExtensionError::Core(e) => e.class(),
            ExtensionError::Catalog(e) => e.class(),
            ExtensionError::Fetch(e) => e.class(),
            ExtensionError::UnsafeArchiveEntry { .. } => ErrorClass::SecurityPolicy,
            ExtensionError::InvalidSkillPackage { .. }
            | ExtensionError::ArchiveEntryTooLarge { .. }
            | ExtensionError::Extraction { .. } => ErrorClass::Content,
            ExtensionError::NotFoundInCatalog { .. }
            | ExtensionError::MissingReference { .. }
            | ExtensionError::NotInstalled { .. } => ErrorClass::Validation,
            ExtensionError::DownloadFailed { .. }
            | ExtensionError::ExtractionTimeout { .. }
            | ExtensionError::PackageInstall { .. }
            | ExtensionError::Io { .. } => ErrorClass::Network,
        }
    }
}
