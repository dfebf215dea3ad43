//! Ordered credential resolution

use crate::strategies::{
    CliHelperStrategy, MetadataServerStrategy, StaticTokenStrategy, TokenStrategy,
};
use crate::token::AccessToken;
use quiver_core::types::{AuthMethod, RuntimeConfig};
use std::time::Duration;
use tracing::debug;

/// A token together with the strategy that produced it
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub token: AccessToken,
    pub strategy: &'static str,
}

/// Tries each strategy in order and returns the first token found.
///
/// Resolution never fails: when every strategy fails or declines, the
/// result is `None`, since public catalogs and registries need no token.
pub struct CredentialResolver {
    strategies: Vec<Box<dyn TokenStrategy>>,
}

impl CredentialResolver {
    /// Metadata server, then CLI helper, then the static token if one is set
    pub fn new(
        metadata_timeout: Duration,
        helper_timeout: Duration,
        static_token: Option<&str>,
    ) -> Self {
        let mut strategies: Vec<Box<dyn TokenStrategy>> = vec![
            Box::new(MetadataServerStrategy::new(metadata_timeout)),
            Box::new(CliHelperStrategy::new(helper_timeout)),
        ];
        if static_token.is_some() {
            strategies.push(Box::new(StaticTokenStrategy::new(static_token)));
        }
        Self { strategies }
    }

    /// Build the chain selected by the runtime configuration.
    ///
    /// `static-token` uses only the configured token; `none` yields an
    /// empty chain.
    pub fn from_runtime_config(config: &RuntimeConfig) -> Self {
        let network = &config.network;
        let marketplace = &config.marketplace;
        match marketplace.auth_method {
            AuthMethod::DelegatedCredential => Self::new(
                Duration::from_secs(network.metadata_timeout_secs),
                Duration::from_secs(network.credential_helper_timeout_secs),
                marketplace.static_token.as_deref(),
            ),
            AuthMethod::StaticToken => Self::with_strategies(vec![Box::new(
                StaticTokenStrategy::new(marketplace.effective_static_token()),
            )]),
            AuthMethod::None => Self::with_strategies(Vec::new()),
        }
    }

    /// Create with explicit strategies (for testing or custom configurations)
    pub fn with_strategies(strategies: Vec<Box<dyn TokenStrategy>>) -> Self {
        Self { strategies }
    }

    /// Names of the configured strategies, in order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn resolve_token(&self) -> Option<AccessToken> {
        self.resolve().await.map(|resolved| resolved.token)
    }

    pub async fn resolve(&self) -> Option<ResolvedToken> {
        for strategy in &self.strategies {
            match strategy.token().await {
                Ok(Some(token)) => {
                    debug!("Registry token resolved via {}", strategy.name());
                    return Some(ResolvedToken {
                        token,
                        strategy: strategy.name(),
                    });
                }
                Ok(None) => debug!("Strategy {} not applicable", strategy.name()),
                Err(e) => debug!("Strategy {} failed: {:#}", strategy.name(), e),
            }
        }
        debug!("No registry token available; continuing unauthenticated");
        None
    }
}
