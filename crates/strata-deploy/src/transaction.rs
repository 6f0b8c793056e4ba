//! All-or-nothing deployment of plugin files
//!
//! ```text
//! Init -> PluginsResolved -> BackedUp -> FilesWritten -> ServicesRestarted -> Archived -> Cleaned
//!                               |            |                 |
//!                               +------------+-----------------+--> Restored -> BackupDirDeleted -> Failed
//! ```
//!
//! Any failure once the backup exists moves written files out of the way,
//! puts backed-up files back, retries the requested services and removes the
//! backup directory before the original error is returned.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use strata_core::ConfigStore;
use strata_plugins::{resolve, ManagedFile, PluginError, PluginInstance, PluginRegistry};
use tracing::{debug, error, info, warn};

use crate::backup::BackupDir;
use crate::error::{DeployError, Result};
use crate::services::{dedup, ServiceAction, ServiceManager};

/// Pseudo plugin name standing for every enabled plugin
pub const ALL_PLUGINS: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    Init,
    PluginsResolved,
    BackedUp,
    FilesWritten,
    ServicesRestarted,
    Archived,
    Cleaned,
    Restored,
    BackupDirDeleted,
    Failed,
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployState::Init => "init",
            DeployState::PluginsResolved => "plugins resolved",
            DeployState::BackedUp => "backed up",
            DeployState::FilesWritten => "files written",
            DeployState::ServicesRestarted => "services restarted",
            DeployState::Archived => "archived",
            DeployState::Cleaned => "cleaned",
            DeployState::Restored => "restored",
            DeployState::BackupDirDeleted => "backup directory deleted",
            DeployState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a deployment should do besides writing files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    /// Plugins whose services are restarted, `all` for every enabled plugin
    pub restart: Vec<String>,
    /// Plugins whose services are reloaded
    pub reload: Vec<String>,
    pub backup: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            restart: Vec::new(),
            reload: Vec::new(),
            backup: true,
        }
    }
}

/// Outcome of a successful deployment
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub state: DeployState,
    pub plugins: Vec<String>,
    pub written: Vec<PathBuf>,
    pub backed_up: Vec<PathBuf>,
    pub restarted: Vec<String>,
    pub reloaded: Vec<String>,
    pub archive: Option<PathBuf>,
}

/// Services to restart and reload, de-duplicated across plugins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePlan {
    pub restart: Vec<String>,
    pub reload: Vec<String>,
}

impl ServicePlan {
    /// Expand plugin names (or `all`) into their services.
    ///
    /// Names that are not enabled plugins fail with `UnknownPlugins`.
    pub fn build(
        plugins: &[PluginInstance],
        restart: &[String],
        reload: &[String],
    ) -> Result<Self> {
        let restart = dedup(
            select(plugins, restart)?
                .into_iter()
                .flat_map(PluginInstance::services_to_restart),
        );
        let reload = dedup(
            select(plugins, reload)?
                .into_iter()
                .flat_map(PluginInstance::services_to_reload)
                .filter(|s| !restart.contains(s)),
        );
        Ok(Self { restart, reload })
    }

    pub fn is_empty(&self) -> bool {
        self.restart.is_empty() && self.reload.is_empty()
    }

    /// Run every service operation, stopping at the first failure
    pub fn run(&self, services: &dyn ServiceManager) -> Result<()> {
        for service in &self.restart {
            services.run(service, ServiceAction::Restart)?;
        }
        for service in &self.reload {
            services.run(service, ServiceAction::Reload)?;
        }
        Ok(())
    }
}

fn select<'p>(
    plugins: &'p [PluginInstance],
    names: &[String],
) -> Result<Vec<&'p PluginInstance>> {
    if names.iter().any(|n| n == ALL_PLUGINS) {
        return Ok(plugins.iter().collect());
    }
    let unknown: Vec<String> = names
        .iter()
        .filter(|n| !plugins.iter().any(|p| p.name() == n.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(PluginError::UnknownPlugins { names: unknown }.into());
    }
    Ok(plugins
        .iter()
        .filter(|p| names.iter().any(|n| n == p.name()))
        .collect())
}

/// Runs deployment transactions
pub struct Deployer<'a> {
    registry: &'a PluginRegistry,
    services: &'a dyn ServiceManager,
    backup_root: PathBuf,
    local_conf: Option<PathBuf>,
}

impl<'a> Deployer<'a> {
    pub fn new(
        registry: &'a PluginRegistry,
        services: &'a dyn ServiceManager,
        backup_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            services,
            backup_root: backup_root.into(),
            local_conf: None,
        }
    }

    /// Local configuration file copied into every backup
    pub fn with_local_conf(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_conf = Some(path.into());
        self
    }

    /// Deploy `enabled` plugins over `effective`
    pub fn deploy(
        &self,
        enabled: &[String],
        effective: &ConfigStore,
        options: &DeployOptions,
    ) -> Result<DeployReport> {
        let mut tx = Transaction::new(self.services);

        let plugins = resolve(self.registry, enabled, effective)?;
        let plan = ServicePlan::build(&plugins, &options.restart, &options.reload)?;
        for plugin in &plugins {
            tx.files.extend(plugin.conf_files()?);
            tx.candidates.extend(plugin.files_to_backup());
        }
        if options.backup {
            // Existing generated files are backed up with the declared ones
            for file in &tx.files {
                if !tx.candidates.iter().any(|c| c.path == file.path) {
                    tx.candidates
                        .push(ManagedFile::backup_candidate(file.path.clone(), &file.plugin));
                }
            }
        }
        tx.plan = plan;
        tx.advance(DeployState::PluginsResolved);

        if options.backup {
            tx.backup = Some(BackupDir::create(&self.backup_root, Local::now())?);
        }

        if let Err(e) = tx.apply(self.local_conf.as_deref()) {
            return Err(tx.rollback(e));
        }

        let archive = match tx.backup.take() {
            Some(backup) => {
                let archive = backup.archive()?;
                tx.advance(DeployState::Archived);
                backup.remove()?;
                Some(archive)
            }
            None => None,
        };
        tx.advance(DeployState::Cleaned);

        Ok(DeployReport {
            state: tx.state,
            plugins: plugins.iter().map(|p| p.name().to_string()).collect(),
            written: tx
                .files
                .iter()
                .filter(|f| f.written)
                .map(|f| f.path.clone())
                .collect(),
            backed_up: tx
                .candidates
                .iter()
                .filter(|f| f.backed_up)
                .map(|f| f.path.clone())
                .collect(),
            restarted: tx.plan.restart.clone(),
            reloaded: tx.plan.reload.clone(),
            archive,
        })
    }
}

struct Transaction<'a> {
    services: &'a dyn ServiceManager,
    state: DeployState,
    files: Vec<ManagedFile>,
    candidates: Vec<ManagedFile>,
    plan: ServicePlan,
    backup: Option<BackupDir>,
}

impl<'a> Transaction<'a> {
    fn new(services: &'a dyn ServiceManager) -> Self {
        Self {
            services,
            state: DeployState::Init,
            files: Vec::new(),
            candidates: Vec::new(),
            plan: ServicePlan::default(),
            backup: None,
        }
    }

    fn advance(&mut self, state: DeployState) {
        debug!("Deployment: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Backup, write and restart
    fn apply(&mut self, local_conf: Option<&Path>) -> Result<()> {
        if let Some(backup) = &self.backup {
            if let Some(local) = local_conf {
                backup.save_local(local)?;
            }
            for candidate in &mut self.candidates {
                backup.stash(candidate)?;
            }
        }
        if self.backup.is_some() {
            self.advance(DeployState::BackedUp);
        }

        for file in &mut self.files {
            write_file(file)?;
        }
        self.advance(DeployState::FilesWritten);

        if !self.plan.is_empty() {
            self.plan.run(self.services)?;
            self.advance(DeployState::ServicesRestarted);
        }
        Ok(())
    }

    /// Undo what `apply` did and return the error to surface
    fn rollback(&mut self, cause: DeployError) -> DeployError {
        error!("Deployment failed in state {}: {}", self.state, cause);

        let mut restore_failure = None;
        for file in self.files.iter().rev().filter(|f| f.written && !f.pre_existed) {
            if let Err(e) = fs::remove_file(&file.path) {
                warn!("Could not remove {}: {}", file.path.display(), e);
                restore_failure.get_or_insert(DeployError::io(&file.path, e));
            }
        }
        if let Some(backup) = &self.backup {
            for candidate in self.candidates.iter().filter(|c| c.backed_up) {
                if let Err(e) = backup.restore(candidate) {
                    warn!("{}", e);
                    restore_failure.get_or_insert(e);
                }
            }
        }
        self.advance(DeployState::Restored);

        if !self.plan.is_empty() {
            if let Err(e) = self.plan.run(self.services) {
                warn!("Service retry after rollback failed: {}", e);
            }
            self.advance(DeployState::ServicesRestarted);
        }

        let failure = match (self.backup.take(), restore_failure) {
            (Some(backup), Some(restore)) => DeployError::RollbackIncomplete {
                source: Box::new(cause),
                restore: Box::new(restore),
                backup_dir: backup.path().to_path_buf(),
            },
            (Some(backup), None) => {
                if let Err(e) = backup.remove() {
                    warn!("Could not remove backup directory: {}", e);
                }
                self.advance(DeployState::BackupDirDeleted);
                cause
            }
            (None, _) => cause,
        };
        self.advance(DeployState::Failed);
        failure
    }
}

fn write_file(file: &mut ManagedFile) -> Result<()> {
    let Some(content) = file.content.as_deref() else {
        return Ok(());
    };
    file.pre_existed = fs::symlink_metadata(&file.path).is_ok();
    strata_core::fs::write_atomic(&file.path, content)?;
    file.written = true;
    info!("Wrote {}", file.path.display());
    Ok(())
}
