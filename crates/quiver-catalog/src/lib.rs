//! Catalog client for Quiver
//!
//! Fetches the remote catalog through the guarded fetcher, validates its
//! structure and provides text search over its entries.

pub mod client;
pub mod error;
pub mod search;
pub mod url;

pub use client::{select_token, validate_catalog, CatalogClient};
pub use error::{CatalogError, Result};
pub use search::{search, SearchResults};
pub use url::normalize_url;
