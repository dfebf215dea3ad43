//! Type definitions for catalogs, install records and runtime configuration

mod catalog;
mod install_record;
mod runtime_config;
mod unit_kind;

pub use catalog::*;
pub use install_record::*;
pub use runtime_config::*;
pub use unit_kind::*;
