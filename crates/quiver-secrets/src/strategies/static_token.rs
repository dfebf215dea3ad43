//! Static configured token strategy

use crate::strategies::TokenStrategy;
use crate::token::AccessToken;
use anyhow::Result;
use async_trait::async_trait;

/// Returns a token supplied through configuration
pub struct StaticTokenStrategy {
    token: Option<AccessToken>,
}

impl StaticTokenStrategy {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token.and_then(AccessToken::new),
        }
    }
}

#[async_trait]
impl TokenStrategy for StaticTokenStrategy {
    async fn token(&self) -> Result<Option<AccessToken>> {
        Ok(self.token.clone())
    }

    fn name(&self) -> &'static str {
        "static-token"
    }
}
