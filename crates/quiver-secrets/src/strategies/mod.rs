//! Token strategy trait and implementations

pub mod cli_helper;
pub mod metadata;
pub mod static_token;

use crate::token::AccessToken;
use anyhow::Result;
use async_trait::async_trait;

/// One way of obtaining a registry bearer token
#[async_trait]
pub trait TokenStrategy: Send + Sync {
    /// Try to obtain a token
    ///
    /// Returns Ok(Some(token)) when a token was produced
    /// Returns Ok(None) when this strategy does not apply here
    /// Returns Err when the attempt failed
    async fn token(&self) -> Result<Option<AccessToken>>;

    /// Strategy name for logs and status output
    fn name(&self) -> &'static str;
}

pub use cli_helper::CliHelperStrategy;
pub use metadata::MetadataServerStrategy;
pub use static_token::StaticTokenStrategy;
