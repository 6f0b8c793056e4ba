//! Manager settings
//!
//! Loaded with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. Settings file (`/etc/strata/strata.conf`, section `[conf]`)
//! 3. Environment variables (STRATA_* prefix)
//!
//! Only the file layer is ever written back.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::store::ConfigStore;
use crate::value::{Codec, ListCodec, TypeTag};

pub const DEFAULT_SETTINGS_PATH: &str = "/etc/strata/strata.conf";
pub const SETTINGS_SECTION: &str = "conf";

const DEFAULT_BASE_DIR: &str = "/etc/strata";
const DEFAULT_ETC_DIR: &str = "/etc";
const DEFAULT_BACKUP_DIR: &str = "/var/backups/strata";
const DEFAULT_PLUGINS_PATH: &str = "/usr/share/strata/plugins";
const DEFAULT_TEMPLATES_PATH: &str = "/usr/share/strata/templates";
const DEFAULT_SERVICE_COMMAND: &str = "systemctl";

/// Where strata finds its configuration, plugins and backups
#[derive(Debug, Clone)]
pub struct Settings {
    file: ConfigStore,
    pub base_dir: PathBuf,
    pub etc_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub plugins_path: PathBuf,
    pub templates_path: PathBuf,
    pub service_command: String,
    plugins: Vec<String>,
}

impl Settings {
    /// Built-in defaults bound to `path`
    pub fn defaults(path: impl Into<PathBuf>) -> Self {
        Self {
            file: ConfigStore::with_path(path),
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            etc_dir: PathBuf::from(DEFAULT_ETC_DIR),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            plugins_path: PathBuf::from(DEFAULT_PLUGINS_PATH),
            templates_path: PathBuf::from(DEFAULT_TEMPLATES_PATH),
            service_command: DEFAULT_SERVICE_COMMAND.to_string(),
            plugins: Vec::new(),
        }
    }

    /// Load settings from `path`; a missing file leaves the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut settings = Self::defaults(path);

        match ConfigStore::load(path) {
            Ok(file) => settings.file = file,
            Err(Error::NotFound { .. }) => {
                tracing::debug!("No settings file at {}, using defaults", path.display());
            }
            Err(e) => return Err(e),
        }
        settings
            .file
            .set_type(SETTINGS_SECTION, "plugins", TypeTag::List)?;
        settings.apply_file()?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_file(&mut self) -> Result<()> {
        let Some(section) = self.file.section(SETTINGS_SECTION) else {
            return Ok(());
        };
        let path_of = |key: &str| {
            section
                .get_raw(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        if let Some(dir) = path_of("base_dir") {
            self.base_dir = dir;
        }
        if let Some(dir) = path_of("etc_dir") {
            self.etc_dir = dir;
        }
        if let Some(dir) = path_of("backup_dir") {
            self.backup_dir = dir;
        }
        if let Some(dir) = path_of("plugins_path") {
            self.plugins_path = dir;
        }
        if let Some(dir) = path_of("templates_path") {
            self.templates_path = dir;
        }
        if let Some(command) = section
            .get_raw("service_command")
            .filter(|v| !v.trim().is_empty())
        {
            self.service_command = command.trim().to_string();
        }
        if let Some(raw) = section.get_raw("plugins") {
            self.plugins = ListCodec::decode(raw).map_err(|e| Error::conversion("plugins", e))?;
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("STRATA_BASE_DIR") {
            self.base_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("STRATA_ETC_DIR") {
            self.etc_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("STRATA_BACKUP_DIR") {
            self.backup_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("STRATA_PLUGINS_PATH") {
            self.plugins_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("STRATA_TEMPLATES_PATH") {
            self.templates_path = PathBuf::from(val);
        }
    }

    /// Settings file path
    pub fn path(&self) -> Option<&Path> {
        self.file.path()
    }

    /// Enabled plugin names, in settings order
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name)
    }

    /// Add `name` to the enabled plugins; `false` if it already was
    pub fn enable_plugin(&mut self, name: &str) -> Result<bool> {
        if self.is_plugin_enabled(name) {
            return Ok(false);
        }
        self.plugins.push(name.to_string());
        self.store_plugins()?;
        Ok(true)
    }

    /// Remove `name` from the enabled plugins; `false` if it was not enabled
    pub fn disable_plugin(&mut self, name: &str) -> Result<bool> {
        let before = self.plugins.len();
        self.plugins.retain(|p| p != name);
        if self.plugins.len() == before {
            return Ok(false);
        }
        self.store_plugins()?;
        Ok(true)
    }

    fn store_plugins(&mut self) -> Result<()> {
        self.file
            .section_mut(SETTINGS_SECTION)
            .set_raw("plugins", ListCodec::encode(&self.plugins));
        Ok(())
    }

    /// Write the settings file atomically
    pub fn save(&self) -> Result<()> {
        self.file.save()
    }
}
