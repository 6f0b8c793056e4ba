//! Dependency checking and ordering of enabled plugins

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use strata_core::ConfigStore;
use tracing::{debug, info};

use crate::error::{PluginError, Result};
use crate::plugin::{Dependency, PluginInstance};
use crate::registry::PluginRegistry;

/// Outcome of checking one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DependencyState {
    Ok { version: String },
    /// Optional dependency that is not enabled
    Skipped,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyInfo {
    pub name: String,
    pub optional: bool,
    pub requirements: Vec<String>,
    #[serde(flatten)]
    pub state: DependencyState,
}

/// Listing entry for an installed plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub enabled: bool,
    pub version: Option<String>,
    pub dependencies: Vec<DependencyInfo>,
    /// Set when the plugin itself could not be built
    pub error: Option<String>,
}

/// Check `dependency` of `plugin` against the enabled set
fn check_dependency(
    registry: &PluginRegistry,
    plugin: &str,
    dependency: &Dependency,
    enabled_versions: &BTreeMap<String, String>,
) -> Result<Option<String>> {
    match enabled_versions.get(&dependency.name) {
        Some(version) => {
            dependency.verify(plugin, version)?;
            Ok(Some(version.clone()))
        }
        None if dependency.optional => Ok(None),
        None if registry.is_installed(&dependency.name) => Err(PluginError::DependencyNotEnabled {
            plugin: plugin.to_string(),
            dependency: dependency.name.clone(),
        }),
        None => Err(PluginError::DependencyNotInstalled {
            plugin: plugin.to_string(),
            dependency: dependency.name.clone(),
        }),
    }
}

/// Build every enabled plugin, check their dependencies and order them so
/// that dependencies come before their dependents.
///
/// Any failure aborts the whole resolution.
pub fn resolve(
    registry: &PluginRegistry,
    enabled: &[String],
    effective: &ConfigStore,
) -> Result<Vec<PluginInstance>> {
    let mut instances = Vec::with_capacity(enabled.len());
    for name in enabled {
        instances.push(registry.instantiate(name, effective)?);
    }

    let versions: BTreeMap<String, String> = instances
        .iter()
        .map(|p| (p.name().to_string(), p.version().to_string()))
        .collect();

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..instances.len()).map(|i| graph.add_node(i)).collect();
    let index_of: HashMap<String, usize> = instances
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name().to_string(), i))
        .collect();

    for (i, instance) in instances.iter_mut().enumerate() {
        let name = instance.name().to_string();
        for dependency in instance.dependencies() {
            let Some(version) = check_dependency(registry, &name, &dependency, &versions)? else {
                debug!("Plugin {}: optional dependency {} skipped", name, dependency.name);
                continue;
            };
            instance.attach_dependency(&dependency.name, &version);
            if let Some(&dep_index) = index_of.get(&dependency.name) {
                graph.add_edge(nodes[dep_index], nodes[i], ());
            }
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| PluginError::CircularDependency {
        plugin: instances[graph[cycle.node_id()]].name().to_string(),
    })?;

    let mut slots: Vec<Option<PluginInstance>> = instances.into_iter().map(Some).collect();
    let ordered: Vec<PluginInstance> = order
        .into_iter()
        .filter_map(|node| slots[graph[node]].take())
        .collect();

    info!(
        "Resolved plugins: {}",
        ordered
            .iter()
            .map(PluginInstance::name)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(ordered)
}

/// Describe installed plugins (all of them, or `names`) without failing on
/// dependency problems
pub fn plugins_infos(
    registry: &PluginRegistry,
    enabled: &[String],
    effective: &ConfigStore,
    names: Option<&[String]>,
) -> Result<Vec<PluginInfo>> {
    let names = match names {
        Some(names) => names.to_vec(),
        None => registry.installed()?,
    };

    let enabled_versions: BTreeMap<String, String> = enabled
        .iter()
        .filter_map(|name| {
            let instance = registry.instantiate(name, effective).ok()?;
            Some((name.clone(), instance.version().to_string()))
        })
        .collect();

    let mut infos = Vec::with_capacity(names.len());
    for name in names {
        let is_enabled = enabled.contains(&name);
        let instance = match registry.instantiate(&name, effective) {
            Ok(instance) => instance,
            Err(e) => {
                infos.push(PluginInfo {
                    name,
                    enabled: is_enabled,
                    version: None,
                    dependencies: Vec::new(),
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        let dependencies = instance
            .dependencies()
            .into_iter()
            .map(|dependency| {
                let state =
                    match check_dependency(registry, &name, &dependency, &enabled_versions) {
                        Ok(Some(version)) => DependencyState::Ok { version },
                        Ok(None) => DependencyState::Skipped,
                        Err(e) => DependencyState::Error {
                            message: e.to_string(),
                        },
                    };
                DependencyInfo {
                    requirements: dependency
                        .requirements
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                    name: dependency.name,
                    optional: dependency.optional,
                    state,
                }
            })
            .collect();

        infos.push(PluginInfo {
            version: Some(instance.version().to_string()),
            name,
            enabled: is_enabled,
            dependencies,
            error: None,
        });
    }
    Ok(infos)
}
