use super::UnitKind;
use serde::{Deserialize, Serialize};

/// Remote manifest enumerating installable extensions and skills.
///
/// Fetched per operation and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Catalog format version
    pub version: u64,

    /// When the catalog was last published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Default package registry for extension installs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Installable extensions
    pub extensions: Vec<ExtensionEntry>,

    /// Installable skills
    pub skills: Vec<SkillEntry>,
}

impl Catalog {
    /// Find an extension by id
    pub fn extension(&self, id: &str) -> Option<&ExtensionEntry> {
        self.extensions.iter().find(|e| e.id == id)
    }

    /// Find a skill by name
    pub fn skill(&self, name: &str) -> Option<&SkillEntry> {
        self.skills.iter().find(|s| s.name == name)
    }
}

/// Catalog entry for a registry-backed extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionEntry {
    /// Stable identifier used for install/uninstall
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Reference handed to the package installer (e.g. `@scope/pkg@1.2.0`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_spec: Option<String>,

    pub version: String,

    pub kind: UnitKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ExtensionEntry {
    /// Package spec, treating an empty string as absent
    pub fn package_ref(&self) -> Option<&str> {
        self.package_spec
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Catalog entry for an archive-backed skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    /// Catalog key and on-disk directory name
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,

    pub version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl SkillEntry {
    /// Archive URL, treating an empty string as absent
    pub fn archive_ref(&self) -> Option<&str> {
        self.archive_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
