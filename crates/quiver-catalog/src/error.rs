//! Error types for quiver-catalog

use quiver_core::ErrorClass;
use quiver_fetch::FetchError;
use thiserror::Error;

/// Result type alias using quiver-catalog's error type
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog document is malformed
    #[error("Invalid catalog from {url}: {message}")]
    InvalidCatalog { url: String, message: String },

    /// Server answered with a non-success status
    #[error("Failed to fetch catalog from {url}: HTTP {status} {reason}")]
    Http {
        url: String,
        status: u16,
        reason: String,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("No catalog URL configured (set marketplace.catalog-url or QUIVER_CATALOG_URL)")]
    NotConfigured,
}

impl CatalogError {
    pub fn invalid_catalog(url: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::InvalidCatalog {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            CatalogError::InvalidCatalog { .. } | CatalogError::NotConfigured => {
                ErrorClass::Validation
            }
            CatalogError::Http { .. } => ErrorClass::Network,
            CatalogError::Fetch(e) => e.class(),
        }
    }
}
