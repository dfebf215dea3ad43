use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an install-record collection lives inside the configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallSection {
    /// `plugins.installs`, keyed by extension id
    Extensions,
    /// `skills.installs`, keyed by skill name
    Skills,
}

impl InstallSection {
    /// Top-level key of the parent object
    pub fn parent_key(&self) -> &'static str {
        match self {
            InstallSection::Extensions => "plugins",
            InstallSection::Skills => "skills",
        }
    }

    /// Key of the records map inside the parent object
    pub fn installs_key(&self) -> &'static str {
        "installs"
    }
}

impl fmt::Display for InstallSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.parent_key(), self.installs_key())
    }
}

/// Behaviour shared by both install-record flavours
pub trait InstallRecord: Serialize + DeserializeOwned + Clone {
    /// Collection the record is stored in
    const SECTION: InstallSection;

    /// Installed version
    fn version(&self) -> &str;

    fn installed_at(&self) -> Option<DateTime<Utc>>;

    fn set_installed_at(&mut self, at: DateTime<Utc>);

    /// Whether the record was produced from the catalog and is subject to sync
    fn is_catalog_managed(&self) -> bool;
}

/// How an extension was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionSource {
    /// Installed from the catalog
    Marketplace,
    /// Installed directly from a registry spec
    Npm,
    /// Linked from a local path
    Path,
    /// Installed from an archive file
    Archive,
}

/// Persisted metadata for an installed extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionInstallRecord {
    pub source: ExtensionSource,

    /// Spec that was handed to the package installer
    pub spec: String,

    /// Directory the package was installed into
    pub install_path: String,

    /// Catalog version at install time
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_spec: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Set once on first install; preserved across updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

impl ExtensionInstallRecord {
    /// New catalog-sourced record with no resolution metadata
    pub fn marketplace(
        spec: impl Into<String>,
        install_path: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            source: ExtensionSource::Marketplace,
            spec: spec.into(),
            install_path: install_path.into(),
            version: version.into(),
            resolved_name: None,
            resolved_version: None,
            resolved_spec: None,
            integrity: None,
            shasum: None,
            resolved_at: None,
            installed_at: None,
        }
    }
}

impl InstallRecord for ExtensionInstallRecord {
    const SECTION: InstallSection = InstallSection::Extensions;

    fn version(&self) -> &str {
        &self.version
    }

    fn installed_at(&self) -> Option<DateTime<Utc>> {
        self.installed_at
    }

    fn set_installed_at(&mut self, at: DateTime<Utc>) {
        self.installed_at = Some(at);
    }

    fn is_catalog_managed(&self) -> bool {
        self.source == ExtensionSource::Marketplace
    }
}

/// How a skill was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    /// Installed from the catalog
    Marketplace,
    /// Installed from an explicit archive URL
    Archive,
}

/// Persisted metadata for an installed skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInstallRecord {
    pub source: SkillSource,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

impl SkillInstallRecord {
    /// New catalog-sourced skill record
    pub fn marketplace(version: impl Into<String>, archive_url: Option<String>) -> Self {
        Self {
            source: SkillSource::Marketplace,
            version: version.into(),
            archive_url,
            installed_at: None,
        }
    }
}

impl InstallRecord for SkillInstallRecord {
    const SECTION: InstallSection = InstallSection::Skills;

    fn version(&self) -> &str {
        &self.version
    }

    fn installed_at(&self) -> Option<DateTime<Utc>> {
        self.installed_at
    }

    fn set_installed_at(&mut self, at: DateTime<Utc>) {
        self.installed_at = Some(at);
    }

    fn is_catalog_managed(&self) -> bool {
        self.source == SkillSource::Marketplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_record_omits_absent_fields() {
        let record = ExtensionInstallRecord::marketplace("@acme/slack@1.0.0", "/x/slack", "1.0.0");
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["source"], "marketplace");
        assert_eq!(obj["installPath"], "/x/slack");
        assert!(!obj.contains_key("integrity"));
        assert!(!obj.contains_key("installedAt"));
    }

    #[test]
    fn test_section_paths() {
        assert_eq!(InstallSection::Extensions.to_string(), "plugins.installs");
        assert_eq!(InstallSection::Skills.to_string(), "skills.installs");
    }
}
