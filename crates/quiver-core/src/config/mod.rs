//! Configuration loading
//!
//! - `HierarchicalConfigLoader`: runtime settings (YAML) with layered precedence
//! - `ConfigDocument` / `ConfigStore`: the persisted JSON document holding install records

mod document;
mod hierarchical_loader;

pub use document::{ConfigDocument, ConfigStore};
pub use hierarchical_loader::HierarchicalConfigLoader;
