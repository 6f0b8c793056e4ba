//! Plugin system for strata
//!
//! Installed plugins are discovered from descriptor files, built over their
//! slice of the effective configuration and resolved against each other's
//! versions before any deployment touches the disk.

pub mod builtin;
pub mod descriptor;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod template;
pub mod version;

pub use descriptor::Descriptor;
pub use error::{PluginError, Result};
pub use plugin::{ConfType, Dependency, ManagedFile, Plugin, PluginContext, PluginInstance};
pub use registry::{PluginFactory, PluginRegistry};
pub use resolver::{plugins_infos, resolve, DependencyInfo, DependencyState, PluginInfo};
pub use template::TemplatePlugin;
pub use version::{compare_versions, Requirement, VersionOp};
