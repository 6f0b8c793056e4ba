//! Entry point tying settings, layered configuration, plugins and services
//! together

use strata_core::{ConfigStore, LayeredConfig, ProfileInfo, Settings};
use strata_plugins::{plugins_infos, resolve, PluginError, PluginInfo, PluginRegistry};
use tracing::{info, warn};

use crate::error::Result;
use crate::services::{CommandServiceManager, ServiceManager};
use crate::transaction::{DeployOptions, DeployReport, Deployer, ServicePlan};

pub struct Manager {
    settings: Settings,
    config: LayeredConfig,
    registry: PluginRegistry,
    services: Box<dyn ServiceManager>,
}

impl Manager {
    /// Open the configuration tree named by `settings`
    pub fn open(settings: Settings) -> Result<Self> {
        let config = LayeredConfig::open(&settings.base_dir)?;
        let registry = PluginRegistry::from_settings(&settings);
        let services = Box::new(CommandServiceManager::new(&settings.service_command));
        Ok(Self {
            settings,
            config,
            registry,
            services,
        })
    }

    /// Replace the service manager used by deployments and restarts
    pub fn with_service_manager(mut self, services: Box<dyn ServiceManager>) -> Self {
        self.services = services;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &LayeredConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LayeredConfig {
        &mut self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Write the local layer back to disk
    pub fn save_local(&self) -> Result<()> {
        Ok(self.config.save_local()?)
    }

    pub fn plugin_enable(&mut self, name: &str) -> Result<()> {
        if !self.registry.is_installed(name) {
            return Err(PluginError::NotInstalled {
                name: name.to_string(),
            }
            .into());
        }
        if !self.settings.enable_plugin(name)? {
            return Err(PluginError::AlreadyEnabled {
                name: name.to_string(),
            }
            .into());
        }
        self.settings.save()?;
        info!("Plugin {} enabled", name);
        Ok(())
    }

    pub fn plugin_disable(&mut self, name: &str) -> Result<()> {
        if !self.settings.disable_plugin(name)? {
            return Err(PluginError::NotEnabled {
                name: name.to_string(),
            }
            .into());
        }
        self.settings.save()?;
        info!("Plugin {} disabled", name);
        Ok(())
    }

    /// Installed plugins (or `names`) with their dependency state
    pub fn plugins_infos(&self, names: Option<&[String]>) -> Result<Vec<PluginInfo>> {
        Ok(plugins_infos(
            &self.registry,
            self.settings.plugins(),
            &self.config.effective(),
            names,
        )?)
    }

    /// `store` with the key types declared by every enabled plugin.
    ///
    /// Plugins that cannot be built are skipped with a warning.
    pub fn with_plugin_types(&self, mut store: ConfigStore) -> Result<ConfigStore> {
        let effective = self.config.effective();
        for name in self.settings.plugins() {
            let instance = match self.registry.instantiate(name, &effective) {
                Ok(instance) => instance,
                Err(e) => {
                    warn!("Skipping key types of plugin {}: {}", name, e);
                    continue;
                }
            };
            for (section_name, section) in instance.conf().sections() {
                if !store.contains_section(section_name) {
                    continue;
                }
                for (key, tag) in section.types() {
                    store.set_type(section_name, key, *tag)?;
                }
            }
        }
        Ok(store)
    }

    pub fn profile_enable(&mut self, name: &str, level: u32) -> Result<()> {
        Ok(self.config.profile_enable(name, level)?)
    }

    pub fn profile_disable(&mut self, name: &str) -> Result<()> {
        Ok(self.config.profile_disable(name)?)
    }

    pub fn profiles_infos(&self) -> Result<Vec<ProfileInfo>> {
        Ok(self.config.profiles_infos()?)
    }

    /// Run the deployment transaction for every enabled plugin
    pub fn deploy(&self, options: &DeployOptions) -> Result<DeployReport> {
        Deployer::new(
            &self.registry,
            self.services.as_ref(),
            &self.settings.backup_dir,
        )
        .with_local_conf(self.config.layout().local_path())
        .deploy(self.settings.plugins(), &self.config.effective(), options)
    }

    /// Restart (or reload) the services of `names`, `all` for every enabled
    /// plugin
    pub fn restart_services(&self, names: &[String], reload: bool) -> Result<ServicePlan> {
        let plugins = resolve(
            &self.registry,
            self.settings.plugins(),
            &self.config.effective(),
        )?;
        let plan = if reload {
            ServicePlan::build(&plugins, &[], names)?
        } else {
            ServicePlan::build(&plugins, names, &[])?
        };
        plan.run(self.services.as_ref())?;
        Ok(plan)
    }
}
