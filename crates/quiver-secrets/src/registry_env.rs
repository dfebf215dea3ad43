//! Registry auth environment for the package-manager subprocess

use crate::token::AccessToken;
use std::collections::BTreeMap;
use url::Url;

/// Generic fallback variable read by most npm-compatible tooling
pub const GENERIC_TOKEN_VAR: &str = "NODE_AUTH_TOKEN";

/// `//host[:port]/path/` scope of a registry URL.
///
/// Unparseable input falls back to stripping the scheme textually. The
/// result always ends with `/`.
pub fn registry_scope(registry_url: &str) -> String {
    let trimmed = registry_url.trim();
    let host_and_path = match Url::parse(trimmed) {
        Ok(url) if url.host_str().is_some() => {
            let mut s = url.host_str().unwrap_or_default().to_string();
            if let Some(port) = url.port() {
                s.push(':');
                s.push_str(&port.to_string());
            }
            s.push_str(url.path());
            s
        }
        _ => match trimmed.split_once("://") {
            Some((_, rest)) => rest.to_string(),
            None => trimmed.trim_start_matches("//").to_string(),
        },
    };

    let mut scope = format!("//{}", host_and_path);
    if !scope.ends_with('/') {
        scope.push('/');
    }
    scope
}

/// Environment entries that authenticate the package manager against
/// `registry_url`: a registry-scoped `_authToken` and the generic fallback.
pub fn build_registry_auth_env(registry_url: &str, token: &AccessToken) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert(
        format!("npm_config_{}:_authToken", registry_scope(registry_url)),
        token.expose().to_string(),
    );
    env.insert(GENERIC_TOKEN_VAR.to_string(), token.expose().to_string());
    env
}
