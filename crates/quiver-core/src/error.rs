//! Error types for quiver-core

use thiserror::Error;

/// Result type alias using quiver-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification shared by every Quiver error type.
///
/// Callers (CLI, HTTP gateway) map outcomes through this instead of
/// inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed input: bad catalog, invalid unit name, unknown id
    Validation,
    /// Non-success HTTP status, DNS failure, timeout, process failure
    Network,
    /// SSRF-blocked address or path-traversal attempt
    SecurityPolicy,
    /// Download succeeded but the content is not a valid package
    Content,
}

impl ErrorClass {
    /// HTTP status an outer transport should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorClass::Validation => 400,
            ErrorClass::SecurityPolicy => 403,
            ErrorClass::Content => 422,
            ErrorClass::Network => 502,
        }
    }

    /// Whether the failure was caused by the caller's input (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ErrorClass::Network)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::Validation => write!(f, "validation"),
            ErrorClass::Network => write!(f, "network"),
            ErrorClass::SecurityPolicy => write!(f, "security-policy"),
            ErrorClass::Content => write!(f, "content"),
        }
    }
}

/// Core error types for Quiver
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// The configuration document has an unexpected shape where the
    /// engine needs to write
    #[error("Invalid configuration document: {message}")]
    InvalidDocument { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unit name is empty
    #[error("Invalid {kind} name: name must not be empty")]
    EmptyUnitName { kind: &'static str },

    /// Unit name would escape its directory
    #[error("Invalid {kind} name '{name}': must not contain path separators or be '.' or '..'")]
    UnsafeUnitName { kind: &'static str, name: String },

    /// Unit name would produce a hidden directory
    #[error("Invalid {kind} name '{name}': must not start with '.'")]
    HiddenUnitName { kind: &'static str, name: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid document error
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::UnsafeUnitName { .. } => ErrorClass::SecurityPolicy,
            Error::Io(_) => ErrorClass::Network,
            _ => ErrorClass::Validation,
        }
    }
}
