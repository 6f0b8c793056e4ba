//! Error types for strata-plugins

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using strata-plugins' PluginError
pub type Result<T> = std::result::Result<T, PluginError>;

/// Plugin discovery, construction and dependency errors
#[derive(Error, Debug)]
pub enum PluginError {
    /// Required dependency has no descriptor
    #[error("Plugin {plugin} depends on plugin {dependency} but it is not installed")]
    DependencyNotInstalled { plugin: String, dependency: String },

    /// Required dependency is installed but not enabled
    #[error("Plugin {plugin} depends on plugin {dependency} but it is not enabled")]
    DependencyNotEnabled { plugin: String, dependency: String },

    /// Dependency version does not satisfy a requirement
    #[error("Plugin {plugin} depends on plugin {dependency} version {op} {required}, but version {actual} is installed")]
    BadVersion {
        plugin: String,
        dependency: String,
        op: String,
        required: String,
        actual: String,
    },

    /// Requirement operator outside of `= > >= < <=`
    #[error("Plugin {plugin} declares a dependency on plugin {dependency} with an invalid requirement type \"{requirement}\"")]
    BadRequirement {
        plugin: String,
        dependency: String,
        requirement: String,
    },

    /// Enabled plugins depend on each other in a loop
    #[error("Circular dependency detected involving plugin {plugin}")]
    CircularDependency { plugin: String },

    /// No descriptor for this plugin
    #[error("Plugin not installed: {name}")]
    NotInstalled { name: String },

    #[error("Plugin already enabled: {name}")]
    AlreadyEnabled { name: String },

    #[error("Plugin not enabled: {name}")]
    NotEnabled { name: String },

    /// Names given for service operations that are not enabled plugins
    #[error("Plugins not enabled: {}", names.join(", "))]
    UnknownPlugins { names: Vec<String> },

    /// Descriptor file content is invalid
    #[error("Invalid plugin descriptor {path}: {message}")]
    Descriptor { path: PathBuf, message: String },

    /// Template lookup or rendering failed
    #[error("Template error in plugin {plugin}: {message}")]
    Template { plugin: String, message: String },

    /// Configuration error
    #[error(transparent)]
    Core(#[from] strata_core::Error),
}

impl PluginError {
    /// Create a template error
    pub fn template(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create a descriptor error
    pub fn descriptor(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Descriptor {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error comes from dependency checking
    pub fn is_dependency_error(&self) -> bool {
        matches!(
            self,
            Self::DependencyNotInstalled { .. }
                | Self::DependencyNotEnabled { .. }
                | Self::BadVersion { .. }
                | Self::BadRequirement { .. }
        )
    }
}
