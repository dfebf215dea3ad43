//! Skill installation from remote archives
//!
//! Pipeline for one install:
//! 1. Validate the skill name (before any network activity)
//! 2. Download the archive through the guarded fetcher into a private
//!    working directory created inside the managed directory
//! 3. Extract into a staging directory, stripping the single top-level
//!    directory, with entry hardening
//! 4. Require `SKILL.md` at the staging root
//! 5. Replace `<managed_dir>/<name>` with the staging directory by rename
//!
//! The working directory is removed on every exit path, and the target
//! path is only touched by the final remove-then-rename.

use crate::error::{ExtensionError, Result};
use flate2::read::GzDecoder;
use quiver_catalog::normalize_url;
use quiver_core::types::NetworkConfig;
use quiver_core::validate_unit_name;
use quiver_fetch::{FetchInit, GuardedFetcher};
use quiver_secrets::AccessToken;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};

/// File that must exist at the root of every skill package
pub const SKILL_MARKER_FILE: &str = "SKILL.md";

/// Largest single entry accepted from an archive (100 MiB)
pub const MAX_ENTRY_SIZE: u64 = 100 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const WORK_DIR_PREFIX: &str = ".quiver-install-";

/// Parameters of a single skill install
#[derive(Debug, Clone)]
pub struct SkillArchiveRequest<'a> {
    pub name: &'a str,
    pub archive_url: &'a str,
    pub managed_dir: &'a Path,
    pub token: Option<&'a AccessToken>,
}

/// Result of a successful skill install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledSkill {
    pub name: String,
    pub target_dir: PathBuf,
    /// SHA-256 of the downloaded archive
    pub sha256: String,
}

/// Downloads and unpacks skill archives
#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    fetcher: GuardedFetcher,
    download_timeout: Duration,
    extract_timeout: Duration,
}

impl ArchiveInstaller {
    pub fn new(fetcher: GuardedFetcher, download_timeout: Duration, extract_timeout: Duration) -> Self {
        Self {
            fetcher,
            download_timeout,
            extract_timeout,
        }
    }

    pub fn from_network_config(fetcher: GuardedFetcher, network: &NetworkConfig) -> Self {
        Self::new(
            fetcher,
            Duration::from_secs(network.download_timeout_secs),
            Duration::from_secs(network.extract_timeout_secs),
        )
    }

    pub async fn install_skill_from_archive(
        &self,
        request: &SkillArchiveRequest<'_>,
    ) -> Result<InstalledSkill> {
        let name = request.name;
        validate_unit_name("skill", name)?;

        let url = normalize_url(request.archive_url);
        info!("Installing skill '{}' from {}", name, url);

        fs::create_dir_all(request.managed_dir).map_err(|e| {
            ExtensionError::io(
                format!("Failed to create {}", request.managed_dir.display()),
                e,
            )
        })?;
        let work_dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir_in(request.managed_dir)
            .map_err(|e| ExtensionError::io("Failed to create working directory", e))?;

        let archive_path = work_dir.path().join("archive");
        let init = FetchInit::bearer(request.token.map(|t| t.expose().to_string()));
        let response = self.fetcher.fetch(&url, init, self.download_timeout).await?;
        if !response.is_success() {
            let status = response.status();
            return Err(ExtensionError::DownloadFailed {
                url,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }
        let size = response.write_to(&archive_path).await?;

        let sha256 = sha256_file(&archive_path)
            .map_err(|e| ExtensionError::io("Failed to checksum archive", e))?;
        debug!("Downloaded {} ({} bytes, sha256 {})", url, size, sha256);

        let staging = work_dir.path().join("staging");
        self.extract(&archive_path, &staging).await?;

        if !staging.join(SKILL_MARKER_FILE).is_file() {
            return Err(ExtensionError::InvalidSkillPackage {
                name: name.to_string(),
                marker: SKILL_MARKER_FILE,
            });
        }

        let target_dir = request.managed_dir.join(name);
        replace_dir(&staging, &target_dir)?;

        info!("Installed skill '{}' to {}", name, target_dir.display());
        Ok(InstalledSkill {
            name: name.to_string(),
            target_dir,
            sha256,
        })
    }

    /// Extract on the blocking pool under the extraction timeout
    async fn extract(&self, archive: &Path, staging: &Path) -> Result<()> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut task = {
            let archive = archive.to_path_buf();
            let staging = staging.to_path_buf();
            let cancelled = cancelled.clone();
            tokio::task::spawn_blocking(move || extract_archive(&archive, &staging, 1, &cancelled))
        };

        match tokio::time::timeout(self.extract_timeout, &mut task).await {
            Ok(Ok(result)) => result.map(|count| debug!("Extracted {} entries", count)),
            Ok(Err(join)) => Err(ExtensionError::extraction(join.to_string())),
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                // The worker stops at the next entry; wait so the work dir
                // is not written to after it is removed.
                let _ = task.await;
                Err(ExtensionError::ExtractionTimeout {
                    timeout_ms: self.extract_timeout.as_millis(),
                })
            }
        }
    }
}

/// Unpack a tar or tar.gz archive into `dest`, dropping `strip` leading
/// path components from every entry.
///
/// Link entries are skipped, permissions and xattrs are not restored, and
/// entries escaping `dest` abort the extraction. Returns the number of
/// entries written.
pub fn extract_archive(
    archive: &Path,
    dest: &Path,
    strip: usize,
    cancelled: &AtomicBool,
) -> Result<usize> {
    let reader = open_archive(archive)
        .map_err(|e| ExtensionError::io(format!("Failed to open {}", archive.display()), e))?;
    let mut tar = Archive::new(reader);
    tar.set_preserve_permissions(false);
    tar.set_unpack_xattrs(false);

    fs::create_dir_all(dest)
        .map_err(|e| ExtensionError::io(format!("Failed to create {}", dest.display()), e))?;

    let mut written = 0;
    let entries = tar
        .entries()
        .map_err(|e| ExtensionError::extraction(e.to_string()))?;
    for entry in entries {
        if cancelled.load(Ordering::SeqCst) {
            return Err(ExtensionError::extraction("cancelled"));
        }
        let mut entry = entry.map_err(|e| ExtensionError::extraction(e.to_string()))?;
        let raw_path = entry
            .path()
            .map_err(|e| ExtensionError::extraction(e.to_string()))?
            .into_owned();

        let entry_type = entry.header().entry_type();
        if matches!(entry_type, EntryType::Symlink | EntryType::Link) {
            debug!("Skipping link entry {}", raw_path.display());
            continue;
        }
        if !matches!(
            entry_type,
            EntryType::Regular | EntryType::Continuous | EntryType::Directory
        ) {
            debug!("Skipping {:?} entry {}", entry_type, raw_path.display());
            continue;
        }

        let Some(relative) = sanitize_entry_path(&raw_path, strip)? else {
            continue;
        };
        let out_path = dest.join(&relative);

        if entry_type == EntryType::Directory {
            fs::create_dir_all(&out_path).map_err(|e| {
                ExtensionError::io(format!("Failed to create {}", out_path.display()), e)
            })?;
            continue;
        }

        let size = entry.header().size().unwrap_or(0);
        if size > MAX_ENTRY_SIZE {
            return Err(ExtensionError::ArchiveEntryTooLarge {
                path: raw_path.display().to_string(),
                size,
                limit: MAX_ENTRY_SIZE,
            });
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ExtensionError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }
        entry.unpack(&out_path).map_err(|e| {
            ExtensionError::extraction(format!("{}: {}", raw_path.display(), e))
        })?;
        written += 1;
    }

    Ok(written)
}

/// Turn an archive entry path into a safe relative path.
///
/// Returns `None` for entries that vanish after stripping (e.g. the
/// top-level directory itself).
pub fn sanitize_entry_path(path: &Path, strip: usize) -> Result<Option<PathBuf>> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                warn!(
                    target: "quiver::security",
                    "Rejected archive entry escaping staging directory: {}",
                    path.display()
                );
                return Err(ExtensionError::UnsafeArchiveEntry {
                    path: path.display().to_string(),
                });
            }
        }
    }

    let relative: PathBuf = parts.into_iter().skip(strip).collect();
    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

fn open_archive(path: &Path) -> io::Result<Box<dyn Read>> {
    let mut magic = [0u8; 2];
    let is_gzip = {
        let mut file = fs::File::open(path)?;
        file.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC
    };
    let file = fs::File::open(path)?;
    if is_gzip {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Remove whatever is at `target`, then move `staging` into its place
fn replace_dir(staging: &Path, target: &Path) -> Result<()> {
    if remove_if_exists(target)
        .map_err(|e| ExtensionError::io(format!("Failed to remove {}", target.display()), e))?
    {
        debug!("Replaced existing {}", target.display());
    }

    fs::rename(staging, target).map_err(|e| {
        ExtensionError::io(
            format!("Failed to move skill into {}", target.display()),
            e,
        )
    })
}

/// Remove a directory tree or file. Returns whether anything was there.
pub(crate) fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|_| true),
        Ok(_) => fs::remove_file(path).map(|_| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_leading_component() {
        let path = sanitize_entry_path(Path::new("pkg/docs/SKILL.md"), 1).unwrap();
        assert_eq!(path, Some(PathBuf::from("docs/SKILL.md")));
        assert_eq!(
            sanitize_entry_path(Path::new("./pkg/SKILL.md"), 1).unwrap(),
            Some(PathBuf::from("SKILL.md"))
        );
        assert_eq!(sanitize_entry_path(Path::new("pkg/"), 1).unwrap(), None);
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        for bad in ["pkg/../../etc/passwd", "/etc/passwd", "../x"] {
            let err = sanitize_entry_path(Path::new(bad), 1).unwrap_err();
            assert!(matches!(err, ExtensionError::UnsafeArchiveEntry { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_replace_dir_overwrites_wholesale() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("staging");
        let target = tmp.path().join("skill");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("SKILL.md"), "new").unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), "old").unwrap();

        replace_dir(&staging, &target).unwrap();

        assert!(!staging.exists());
        assert_eq!(fs::read_to_string(target.join("SKILL.md")).unwrap(), "new");
        assert!(!target.join("stale.txt").exists());
    }
}
