//! Plugin discovery and construction
//!
//! Installed plugins are the `*.conf` descriptors found in the plugins
//! directory. Each is built through the factory registered under its name,
//! or as a [`TemplatePlugin`] when no factory is registered.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use strata_core::store::CONF_EXTENSION;
use strata_core::{ConfigStore, Error, Settings};
use tracing::debug;

use crate::builtin::{Environment, Hosts};
use crate::descriptor::Descriptor;
use crate::error::{PluginError, Result};
use crate::plugin::{Plugin, PluginContext, PluginInstance};
use crate::template::TemplatePlugin;

/// Builds a plugin from its descriptor
pub type PluginFactory = fn(&Descriptor) -> Box<dyn Plugin>;

fn environment_factory(descriptor: &Descriptor) -> Box<dyn Plugin> {
    Box::new(Environment::new(descriptor))
}

fn hosts_factory(descriptor: &Descriptor) -> Box<dyn Plugin> {
    Box::new(Hosts::new(descriptor))
}

fn template_factory(descriptor: &Descriptor) -> Box<dyn Plugin> {
    Box::new(TemplatePlugin::new(descriptor))
}

/// Registry of installed plugins
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    plugins_path: PathBuf,
    templates_path: PathBuf,
    etc_dir: PathBuf,
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Registry with the built-in factories
    pub fn new(
        plugins_path: impl Into<PathBuf>,
        templates_path: impl Into<PathBuf>,
        etc_dir: impl Into<PathBuf>,
    ) -> Self {
        let mut registry = Self {
            plugins_path: plugins_path.into(),
            templates_path: templates_path.into(),
            etc_dir: etc_dir.into(),
            factories: BTreeMap::new(),
        };
        registry.register("environment", environment_factory);
        registry.register("hosts", hosts_factory);
        registry
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.plugins_path,
            &settings.templates_path,
            &settings.etc_dir,
        )
    }

    /// Register (or replace) the factory used for `name`
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn plugins_path(&self) -> &Path {
        &self.plugins_path
    }

    pub fn etc_dir(&self) -> &Path {
        &self.etc_dir
    }

    pub fn descriptor_path(&self, name: &str) -> PathBuf {
        self.plugins_path
            .join(format!("{}.{}", name, CONF_EXTENSION))
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.descriptor_path(name).is_file()
    }

    /// Names of all installed plugins, sorted
    pub fn installed(&self) -> Result<Vec<String>> {
        if !self.plugins_path.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.plugins_path)
            .map_err(|e| Error::io(&self.plugins_path, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(&self.plugins_path, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == CONF_EXTENSION) {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn descriptor(&self, name: &str) -> Result<Descriptor> {
        if !self.is_installed(name) {
            return Err(PluginError::NotInstalled {
                name: name.to_string(),
            });
        }
        Descriptor::load(name, &self.descriptor_path(name))
    }

    /// Build plugin `name` over its view of `effective`
    pub fn instantiate(&self, name: &str, effective: &ConfigStore) -> Result<PluginInstance> {
        let descriptor = self.descriptor(name)?;
        let factory = self
            .factories
            .get(name)
            .copied()
            .unwrap_or(template_factory as PluginFactory);

        debug!("Instantiating plugin {} from {}", name, descriptor.path.display());
        let ctx = PluginContext {
            name: name.to_string(),
            conf: effective.plugin_view(name),
            etc_dir: self.etc_dir.clone(),
            templates_dir: self.templates_path.clone(),
            dependencies: BTreeMap::new(),
        };
        PluginInstance::new(ctx, factory(&descriptor))
    }
}
