use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of an installable extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Chat channel adapter
    Channel,
    /// Agent tool
    Tool,
    /// Memory provider (exclusive)
    Memory,
    /// Model provider
    Provider,
}

impl UnitKind {
    /// Every kind, in display order
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Channel,
        UnitKind::Tool,
        UnitKind::Memory,
        UnitKind::Provider,
    ];

    /// Name of the exclusive slot this kind occupies, if any.
    ///
    /// At most one enabled unit may hold a slot at a time.
    pub fn exclusive_slot(&self) -> Option<&'static str> {
        match self {
            UnitKind::Memory => Some("memory"),
            UnitKind::Channel | UnitKind::Tool | UnitKind::Provider => None,
        }
    }

    /// Whether this kind is single-instance
    pub fn is_exclusive(&self) -> bool {
        self.exclusive_slot().is_some()
    }

    /// Human-readable label used in warnings and tables
    pub fn label(&self) -> &'static str {
        match self {
            UnitKind::Channel => "channel",
            UnitKind::Tool => "tool",
            UnitKind::Memory => "memory provider",
            UnitKind::Provider => "model provider",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Channel => write!(f, "channel"),
            UnitKind::Tool => write!(f, "tool"),
            UnitKind::Memory => write!(f, "memory"),
            UnitKind::Provider => write!(f, "provider"),
        }
    }
}

/// The two families of installable units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// Registry-backed package
    Extension,
    /// Archive-backed skill bundle
    Skill,
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitType::Extension => write!(f, "extension"),
            UnitType::Skill => write!(f, "skill"),
        }
    }
}

impl FromStr for UnitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "extension" | "plugin" => Ok(UnitType::Extension),
            "skill" => Ok(UnitType::Skill),
            other => Err(format!(
                "Unknown unit type '{}'. Valid types: extension, skill",
                other
            )),
        }
    }
}
