//! Writing rendered artefacts to disk
//!
//! All absolute target paths are resolved under a target root so a run can
//! be pointed at a staging tree instead of `/`. Existing files that would
//! change are copied into a timestamped backup directory first, and every
//! write goes through a temp file plus rename.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config_file::ProvisionConfig;
use crate::zone::{parse_serial, Serial};

/// Filesystem root that absolute config paths are resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRoot(PathBuf);

impl Default for TargetRoot {
    fn default() -> Self {
        Self(PathBuf::from("/"))
    }
}

impl TargetRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn is_system_root(&self) -> bool {
        self.0 == Path::new("/")
    }

    /// Map an absolute path like `/etc/bind/x` to `<root>/etc/bind/x`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.0.join(relative)
    }
}

/// What happened to one artefact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// File written; `backup` holds the previous contents if there were any
    Written { backup: Option<PathBuf> },
    /// Existing file already had identical contents
    Unchanged,
    /// Dry-run: nothing touched
    Skipped,
}

/// Writes artefacts under a target root with backup-before-overwrite
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: TargetRoot,
    backup_dir: PathBuf,
    dry_run: bool,
}

impl ArtifactWriter {
    /// Backups go to `<bind_dir>/.bindsetup_backup_<stamp>/` under the root
    pub fn new(root: TargetRoot, config: &ProvisionConfig, dry_run: bool) -> Self {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let backup_dir = root
            .resolve(&config.bind_dir)
            .join(format!(".bindsetup_backup_{}", stamp));
        Self {
            root,
            backup_dir,
            dry_run,
        }
    }

    pub fn root(&self) -> &TargetRoot {
        &self.root
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Create a directory (and parents) under the root
    pub fn ensure_dir(&self, dir: &Path) -> Result<()> {
        let target = self.root.resolve(dir);
        if self.dry_run {
            info!("[DRY RUN] Would create directory {}", target.display());
            return Ok(());
        }
        fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create directory {}", target.display()))
    }

    /// Write `contents` to the absolute `path` (resolved under the root)
    pub fn write(&self, path: &Path, contents: &str) -> Result<WriteOutcome> {
        let target = self.root.resolve(path);

        let existing = match fs::read_to_string(&target) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", target.display()));
            }
        };

        if existing.as_deref() == Some(contents) {
            debug!("{} unchanged", target.display());
            return Ok(WriteOutcome::Unchanged);
        }

        if self.dry_run {
            info!("[DRY RUN] Would write {} ({} bytes)", target.display(), contents.len());
            return Ok(WriteOutcome::Skipped);
        }

        let backup = match existing {
            Some(_) => Some(self.back_up(path, &target)?),
            None => None,
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp = temp_path_for(&target);
        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &target)
            .with_context(|| format!("Failed to move {} into place", target.display()))?;

        Ok(WriteOutcome::Written { backup })
    }

    fn back_up(&self, original: &Path, target: &Path) -> Result<PathBuf> {
        let relative = original.strip_prefix("/").unwrap_or(original);
        let dst = self.backup_dir.join(relative);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create backup dir {}", parent.display()))?;
        }
        fs::copy(target, &dst)
            .with_context(|| format!("Failed to back up {}", target.display()))?;
        info!("Backed up {} to {}", target.display(), dst.display());
        Ok(dst)
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.bindsetup.tmp", name))
}

/// Serial of the zone file currently on disk, if there is one
pub fn read_existing_serial(root: &TargetRoot, config: &ProvisionConfig) -> Option<Serial> {
    let path = root.resolve(&config.zone_file_path());
    fs::read_to_string(&path).ok().and_then(|text| parse_serial(&text))
}
