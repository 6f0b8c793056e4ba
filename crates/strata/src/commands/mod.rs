//! Command implementations

pub mod config;
pub mod deploy;
pub mod plugin;
pub mod profile;

use std::path::Path;

use anyhow::{Context, Result};
use strata_core::Settings;
use strata_deploy::Manager;
use tracing::debug;

/// Load settings from `path` and open the configuration tree they name
pub fn load_manager(path: &Path) -> Result<Manager> {
    let settings = Settings::load(path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    debug!(
        "Settings {}: base {}, plugins {}, backups {}",
        path.display(),
        settings.base_dir.display(),
        settings.plugins_path.display(),
        settings.backup_dir.display()
    );
    let base_dir = settings.base_dir.clone();
    Manager::open(settings)
        .with_context(|| format!("Failed to open configuration in {}", base_dir.display()))
}
