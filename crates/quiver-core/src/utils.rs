//! Shared utility functions for Quiver crates

use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::warn;

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// containerised deployments which remap HOME are respected.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir().ok_or_else(|| Error::invalid_config("Could not determine home directory"))
}

/// Get the Quiver state directory (`$QUIVER_HOME` or `~/.quiver`)
pub fn get_quiver_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("QUIVER_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    Ok(get_home_dir()?.join(".quiver"))
}

/// Validate a skill name or extension id for use as a single directory name.
///
/// Checks run in a fixed order and each has its own error:
/// 1. non-empty, no `/` or `\`, not `.` or `..`
/// 2. does not start with `.`
///
/// `kind` is only used in messages ("skill", "extension").
pub fn validate_unit_name(kind: &'static str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::EmptyUnitName { kind });
    }

    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        warn!(
            target: "quiver::security",
            "Rejected path-traversal {} name: {:?}", kind, name
        );
        return Err(Error::UnsafeUnitName {
            kind,
            name: name.to_string(),
        });
    }

    if name.starts_with('.') {
        return Err(Error::HiddenUnitName {
            kind,
            name: name.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_home_dir_from_env() {
        if std::env::var("HOME").is_ok() {
            let home = get_home_dir().unwrap();
            assert!(!home.as_os_str().is_empty());
        }
    }

    #[test]
    fn test_validate_unit_name_accepts_plain_names() {
        assert!(validate_unit_name("skill", "good-skill").is_ok());
        assert!(validate_unit_name("skill", "a.b").is_ok());
        assert!(validate_unit_name("extension", "memory_lance").is_ok());
    }

    #[test]
    fn test_validate_unit_name_rejects_traversal() {
        for name in ["a/b", "a\\b", ".", "..", "../x", "/abs"] {
            let err = validate_unit_name("skill", name).unwrap_err();
            assert!(
                matches!(err, Error::UnsafeUnitName { .. }),
                "expected traversal rejection for {:?}, got {:?}",
                name,
                err
            );
        }
    }

    #[test]
    fn test_validate_unit_name_rejects_empty_and_hidden() {
        assert!(matches!(
            validate_unit_name("skill", ""),
            Err(Error::EmptyUnitName { .. })
        ));
        assert!(matches!(
            validate_unit_name("skill", ".hidden"),
            Err(Error::HiddenUnitName { .. })
        ));
    }
}
