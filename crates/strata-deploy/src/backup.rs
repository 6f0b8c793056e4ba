//! Per-deployment backup directories
//!
//! ```text
//! <backup_root>/2024-05-01-12:00:00/
//!     strata/local.conf
//!     <plugin>/<file name>
//! ```
//!
//! A successful deployment archives the directory to
//! `<backup_root>/strata_backup_<dir name>.tgz` and removes it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use strata_plugins::ManagedFile;
use tar::Builder as TarBuilder;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{DeployError, Result};

const DIR_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";
const LOCAL_CONF_DIR: &str = "strata";
const ARCHIVE_PREFIX: &str = "strata_backup_";

#[derive(Debug)]
pub struct BackupDir {
    path: PathBuf,
}

impl BackupDir {
    /// Create a fresh directory named after `now` under `root`
    pub fn create(root: &Path, now: DateTime<Local>) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| DeployError::io(root, e))?;

        let stamp = now.format(DIR_FORMAT).to_string();
        let mut path = root.join(&stamp);
        let mut suffix = 1;
        while path.exists() {
            path = root.join(format!("{}-{}", stamp, suffix));
            suffix += 1;
        }
        fs::create_dir(&path).map_err(|e| DeployError::io(&path, e))?;

        info!("Backup directory: {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep a copy of the local configuration file, when there is one
    pub fn save_local(&self, local: &Path) -> Result<Option<PathBuf>> {
        if !local.is_file() {
            return Ok(None);
        }
        let dir = self.path.join(LOCAL_CONF_DIR);
        fs::create_dir_all(&dir).map_err(|e| DeployError::io(&dir, e))?;
        let target = dir.join(local.file_name().unwrap_or(local.as_os_str()));
        fs::copy(local, &target).map_err(|e| DeployError::io(&target, e))?;
        Ok(Some(target))
    }

    /// Move an existing file into its plugin folder. Missing files are skipped.
    pub fn stash(&self, file: &mut ManagedFile) -> Result<()> {
        if fs::symlink_metadata(&file.path).is_err() {
            debug!("Nothing to back up at {}", file.path.display());
            return Ok(());
        }

        let dir = self.path.join(&file.plugin);
        fs::create_dir_all(&dir).map_err(|e| DeployError::io(&dir, e))?;
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let mut target = dir.join(&name);
        let mut suffix = 1;
        while target.exists() {
            target = dir.join(format!("{}.{}", name, suffix));
            suffix += 1;
        }

        move_file(&file.path, &target).map_err(|e| DeployError::io(&file.path, e))?;
        debug!("Backed up {} to {}", file.path.display(), target.display());
        file.backed_up = true;
        file.backup_path = Some(target);
        Ok(())
    }

    /// Move a stashed file back to its original path
    pub fn restore(&self, file: &ManagedFile) -> Result<()> {
        let Some(backup) = file.backup_path.as_ref().filter(|_| file.backed_up) else {
            return Ok(());
        };
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent).map_err(|source| DeployError::Restore {
                path: file.path.clone(),
                source,
            })?;
        }
        move_file(backup, &file.path).map_err(|source| DeployError::Restore {
            path: file.path.clone(),
            source,
        })?;
        info!("Restored {}", file.path.display());
        Ok(())
    }

    /// Write `strata_backup_<dir name>.tgz` next to the directory
    pub fn archive(&self) -> Result<PathBuf> {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = self.path.parent().unwrap_or(Path::new("."));
        let archive_path = parent.join(format!("{}{}.tgz", ARCHIVE_PREFIX, name));

        let file = File::create(&archive_path).map_err(|e| DeployError::io(&archive_path, e))?;
        let mut tar = TarBuilder::new(GzEncoder::new(file, Compression::default()));
        for entry in WalkDir::new(&self.path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                DeployError::io(path, e.into())
            })?;
            let rel = entry.path().strip_prefix(parent).unwrap_or(entry.path());
            let appended = if entry.file_type().is_dir() {
                tar.append_dir(rel, entry.path())
            } else {
                tar.append_path_with_name(entry.path(), rel)
            };
            appended.map_err(|e| DeployError::io(entry.path(), e))?;
        }
        tar.into_inner()
            .and_then(|encoder| encoder.finish())
            .map_err(|e| DeployError::io(&archive_path, e))?;

        info!("Backup archived to {}", archive_path.display());
        Ok(archive_path)
    }

    pub fn remove(self) -> Result<()> {
        fs::remove_dir_all(&self.path).map_err(|e| DeployError::io(&self.path, e))
    }
}

/// Rename, falling back to copy and delete across filesystems
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) if from.is_file() => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
