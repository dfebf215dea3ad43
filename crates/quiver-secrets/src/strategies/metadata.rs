//! Instance metadata server token strategy

use crate::strategies::TokenStrategy;
use crate::token::AccessToken;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default service-account token endpoint
pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
}

/// Reads an access token from the host-local metadata server.
///
/// The endpoint is host-local and trusted, so this uses a plain client
/// rather than the guarded fetcher.
pub struct MetadataServerStrategy {
    endpoint: String,
    timeout: Duration,
}

impl MetadataServerStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            endpoint: DEFAULT_METADATA_TOKEN_URL.to_string(),
            timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Default for MetadataServerStrategy {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[async_trait]
impl TokenStrategy for MetadataServerStrategy {
    async fn token(&self) -> Result<Option<AccessToken>> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .no_proxy()
            .build()
            .context("Failed to build metadata client")?;

        let response = client
            .get(&self.endpoint)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await
            .context("Metadata server unreachable")?;

        if !response.status().is_success() {
            return Err(anyhow!("Metadata server returned {}", response.status()));
        }

        let body: MetadataTokenResponse = response
            .json()
            .await
            .context("Metadata server returned an unexpected body")?;

        debug!("Obtained token from metadata server");
        Ok(AccessToken::new(body.access_token))
    }

    fn name(&self) -> &'static str {
        "metadata-server"
    }
}
