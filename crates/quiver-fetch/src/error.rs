//! Error types for quiver-fetch

use quiver_core::ErrorClass;
use std::net::IpAddr;
use thiserror::Error;

/// Result type alias using quiver-fetch's error type
pub type Result<T> = std::result::Result<T, FetchError>;

/// Failures of a guarded fetch. DNS failure, policy violation and timeout
/// are deliberately separate variants.
#[derive(Error, Debug)]
pub enum FetchError {
    /// URL could not be parsed or has no host
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Only http and https are fetched
    #[error("Unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme { url: String, scheme: String },

    /// Hostname did not resolve
    #[error("DNS resolution failed for {host}: {message}")]
    Dns { host: String, message: String },

    /// Destination address is not allowed by the SSRF policy
    #[error("Blocked request to {url}: {host} resolves to non-public address {addr}")]
    Blocked {
        url: String,
        host: String,
        addr: IpAddr,
    },

    /// Deadline elapsed before the exchange completed
    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u128 },

    #[error("Too many redirects (max {max}) starting from {url}")]
    TooManyRedirects { url: String, max: usize },

    #[error("Redirect from {url} has an invalid Location header: {reason}")]
    BadRedirect { url: String, reason: String },

    /// Transport-level failure
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response body could not be decoded
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("IO error while saving response from {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            FetchError::Blocked { .. } | FetchError::UnsupportedScheme { .. } => {
                ErrorClass::SecurityPolicy
            }
            FetchError::InvalidUrl { .. } => ErrorClass::Validation,
            _ => ErrorClass::Network,
        }
    }

    /// Whether this is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    /// Whether this is an SSRF policy rejection
    pub fn is_blocked(&self) -> bool {
        matches!(self, FetchError::Blocked { .. })
    }

    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        FetchError::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
