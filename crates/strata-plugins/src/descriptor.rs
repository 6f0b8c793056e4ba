//! Plugin descriptor files
//!
//! A plugin is installed when `<plugins_path>/<name>.conf` exists:
//!
//! ```text
//! [plugin]
//! version = 1.2.0
//! files = hosts
//! backup = hosts
//! restart = networking
//! reload =
//! types = entries:sequence, enabled:bool
//!
//! [dependency:environment]
//! optional = no
//! ge = 1.0
//! ```

use std::path::{Path, PathBuf};

use strata_core::value::{BoolCodec, Codec, ListCodec};
use strata_core::{ConfigSection, ConfigStore, TypeTag};

use crate::error::{PluginError, Result};
use crate::version::{Requirement, VersionOp};

pub const PLUGIN_SECTION: &str = "plugin";
pub const DEPENDENCY_PREFIX: &str = "dependency:";

/// Parsed descriptor of an installed plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub path: PathBuf,
    pub version: String,
    /// Generated files, relative to the etc directory unless absolute
    pub files: Vec<PathBuf>,
    pub backup: Vec<PathBuf>,
    pub restart: Vec<String>,
    pub reload: Vec<String>,
    /// Key types declared on the plugin's own section
    pub types: Vec<(String, TypeTag)>,
    pub dependencies: Vec<crate::plugin::Dependency>,
}

impl Descriptor {
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        let store = ConfigStore::load(path)?;
        Self::from_store(name, path, &store)
    }

    pub fn from_store(name: &str, path: &Path, store: &ConfigStore) -> Result<Self> {
        let empty = ConfigSection::new(PLUGIN_SECTION);
        let section = store.section(PLUGIN_SECTION).unwrap_or(&empty);

        let list = |key: &str| -> Result<Vec<String>> {
            match section.get_raw(key) {
                Some(raw) => ListCodec::decode(raw)
                    .map_err(|e| PluginError::descriptor(path, format!("{}: {}", key, e))),
                None => Ok(Vec::new()),
            }
        };

        let mut types = Vec::new();
        for entry in list("types")? {
            let (key, tag) = entry.rsplit_once(':').ok_or_else(|| {
                PluginError::descriptor(path, format!("type \"{}\" is not key:type", entry))
            })?;
            let tag = tag
                .trim()
                .parse::<TypeTag>()
                .map_err(|e| PluginError::descriptor(path, e.to_string()))?;
            types.push((key.trim().to_string(), tag));
        }

        let mut dependencies = Vec::new();
        for (section_name, content) in store.sections() {
            if let Some(dependency) = section_name.strip_prefix(DEPENDENCY_PREFIX) {
                dependencies.push(parse_dependency(name, dependency, content, path)?);
            }
        }

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            version: section.get_raw("version").unwrap_or_default().to_string(),
            files: list("files")?.into_iter().map(PathBuf::from).collect(),
            backup: list("backup")?.into_iter().map(PathBuf::from).collect(),
            restart: list("restart")?,
            reload: list("reload")?,
            types,
            dependencies,
        })
    }
}

fn parse_dependency(
    plugin: &str,
    dependency: &str,
    section: &ConfigSection,
    path: &Path,
) -> Result<crate::plugin::Dependency> {
    let mut parsed = crate::plugin::Dependency::new(dependency);
    for (key, value) in section.iter() {
        if key == "optional" {
            parsed.optional = BoolCodec::decode(value)
                .map_err(|e| PluginError::descriptor(path, format!("optional: {}", e)))?;
            continue;
        }
        let op = VersionOp::parse(key).ok_or_else(|| PluginError::BadRequirement {
            plugin: plugin.to_string(),
            dependency: dependency.to_string(),
            requirement: key.clone(),
        })?;
        parsed.requirements.push(Requirement::new(op, value.trim()));
    }
    Ok(parsed)
}
