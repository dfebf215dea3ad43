//! # quiver-core
//!
//! Core library for Quiver providing:
//! - Catalog and install-record type definitions
//! - The install ledger (immutable upsert/delete over the configuration document)
//! - Exclusive slot resolution for single-instance unit kinds
//! - Runtime configuration loading and configuration-document persistence
//! - The shared error taxonomy

pub mod config;
pub mod error;
pub mod ledger;
pub mod slots;
pub mod types;
pub mod utils;

pub use config::{ConfigDocument, ConfigStore, HierarchicalConfigLoader};
pub use error::{Error, ErrorClass, Result};
pub use slots::{apply_selection, RegisteredUnit, SlotSelection, SlotWarning};
pub use utils::{get_home_dir, validate_unit_name};
