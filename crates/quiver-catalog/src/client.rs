//! Catalog fetching and validation

use crate::error::{CatalogError, Result};
use crate::url::normalize_url;
use quiver_core::types::{AuthMethod, Catalog, RuntimeConfig};
use quiver_fetch::{FetchInit, GuardedFetcher};
use quiver_secrets::{AccessToken, CredentialResolver};
use reqwest::header::{HeaderValue, ACCEPT};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Fetches catalogs through the guarded fetcher
#[derive(Debug, Clone)]
pub struct CatalogClient {
    fetcher: GuardedFetcher,
    timeout: Duration,
}

impl CatalogClient {
    pub fn new(fetcher: GuardedFetcher, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    pub fn from_runtime_config(config: &RuntimeConfig) -> Self {
        Self::new(
            GuardedFetcher::from_network_config(&config.network),
            Duration::from_secs(config.network.http_timeout_secs),
        )
    }

    /// Fetch and validate the catalog at `url`
    pub async fn fetch_catalog(&self, url: &str, token: Option<&AccessToken>) -> Result<Catalog> {
        let url = normalize_url(url);
        debug!("Fetching catalog from {}", url);

        let mut init = FetchInit::bearer(token.map(|t| t.expose().to_string()));
        init.headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));

        let response = self.fetcher.fetch(&url, init, self.timeout).await?;
        if !response.is_success() {
            let status = response.status();
            return Err(CatalogError::Http {
                url,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| CatalogError::invalid_catalog(&url, format!("not valid JSON: {}", e)))?;
        let catalog = validate_catalog(&url, value)?;

        info!(
            "Loaded catalog v{} ({} extensions, {} skills)",
            catalog.version,
            catalog.extensions.len(),
            catalog.skills.len()
        );
        Ok(catalog)
    }

    /// Fetch with credentials chosen by `auth_method`; see [`select_token`]
    pub async fn fetch_catalog_with_auth(
        &self,
        url: &str,
        auth_method: AuthMethod,
        static_token: Option<&str>,
        resolver: &CredentialResolver,
    ) -> Result<Catalog> {
        let token = select_token(auth_method, static_token, resolver).await;
        self.fetch_catalog(url, token.as_ref()).await
    }
}

/// Bearer token for one operation, chosen by `auth_method`.
///
/// A static token wins when supplied. Otherwise `delegated-credential`
/// asks `resolver` for a token; failing to get one means going
/// unauthenticated. Callers resolve once and reuse the token for the catalog
/// fetch and every download in the same operation.
pub async fn select_token(
    auth_method: AuthMethod,
    static_token: Option<&str>,
    resolver: &CredentialResolver,
) -> Option<AccessToken> {
    match static_token.and_then(AccessToken::new) {
        Some(token) => Some(token),
        None if auth_method == AuthMethod::DelegatedCredential => {
            let resolved = resolver.resolve_token().await;
            if resolved.is_none() {
                debug!("No credential available; continuing unauthenticated");
            }
            resolved
        }
        None => None,
    }
}

/// Check the catalog's structure and decode it.
///
/// `version` must be a non-negative integer and `extensions`/`skills` must
/// be arrays; the message names the offending field.
pub fn validate_catalog(url: &str, value: Value) -> Result<Catalog> {
    let Some(object) = value.as_object() else {
        return Err(CatalogError::invalid_catalog(
            url,
            "catalog must be a JSON object",
        ));
    };

    if !object.get("version").is_some_and(|v| v.as_u64().is_some()) {
        return Err(CatalogError::invalid_catalog(
            url,
            "field `version` must be a non-negative integer",
        ));
    }
    for field in ["extensions", "skills"] {
        if !object.get(field).is_some_and(Value::is_array) {
            return Err(CatalogError::invalid_catalog(
                url,
                format!("field `{}` must be an array", field),
            ));
        }
    }

    serde_json::from_value(value).map_err(|e| CatalogError::invalid_catalog(url, e.to_string()))
}
