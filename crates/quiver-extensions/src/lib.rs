//! Extension and skill installation for Quiver
//!
//! This crate provides:
//! - Skill installation from remote archives (download, hardened
//!   extraction, marker check, atomic replace)
//! - The package-installer collaborator for registry-backed extensions
//! - Sync of installed units against the catalog
//! - `InstallService`, the facade used by CLI and HTTP callers

pub mod archive;
pub mod error;
pub mod package;
pub mod service;
pub mod sync;

pub use archive::{ArchiveInstaller, InstalledSkill, SkillArchiveRequest, SKILL_MARKER_FILE};
pub use error::{ExtensionError, Result};
pub use package::{
    NpmPackageInstaller, PackageInstallOutcome, PackageInstallRequest, PackageInstaller,
};
pub use service::{InstallOutcome, InstallService, InstalledUnit, UninstallOutcome};
pub use sync::{SyncOutcome, SyncReconciler, SyncReport, SyncStatus};
