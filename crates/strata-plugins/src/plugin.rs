//! Plugin contract
//!
//! A plugin owns one piece of system configuration. It is built fresh for
//! every operation from the slice of the effective configuration named after
//! it, and turns that configuration into files and service operations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use strata_core::{ConfigStore, TypeTag};

use crate::error::{PluginError, Result};
use crate::version::Requirement;

/// Dependency of a plugin on another plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    pub optional: bool,
    pub requirements: Vec<Requirement>,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            requirements: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn requiring(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Check `actual` against every requirement
    pub fn verify(&self, plugin: &str, actual: &str) -> Result<()> {
        match self.requirements.iter().find(|r| !r.matches(actual)) {
            Some(failed) => Err(PluginError::BadVersion {
                plugin: plugin.to_string(),
                dependency: self.name.clone(),
                op: failed.op.symbol().to_string(),
                required: failed.version.clone(),
                actual: actual.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Declared type of a key in the plugin's configuration view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfType {
    pub section: String,
    pub key: String,
    pub tag: TypeTag,
}

impl ConfType {
    pub fn new(section: impl Into<String>, key: impl Into<String>, tag: TypeTag) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            tag,
        }
    }
}

/// A file a deployment writes or backs up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub path: PathBuf,
    /// Generated content; `None` for files that are only backed up
    pub content: Option<String>,
    pub plugin: String,
    pub backed_up: bool,
    pub written: bool,
    /// Whether something existed at `path` before the deployment wrote it
    pub pre_existed: bool,
    pub backup_path: Option<PathBuf>,
}

impl ManagedFile {
    pub fn generated(path: PathBuf, content: String, plugin: impl Into<String>) -> Self {
        Self {
            path,
            content: Some(content),
            plugin: plugin.into(),
            backed_up: false,
            written: false,
            pre_existed: false,
            backup_path: None,
        }
    }

    pub fn backup_candidate(path: PathBuf, plugin: impl Into<String>) -> Self {
        Self {
            path,
            content: None,
            plugin: plugin.into(),
            backed_up: false,
            written: false,
            pre_existed: false,
            backup_path: None,
        }
    }
}

/// What a plugin is constructed with
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub name: String,
    /// Sections `name` and `name:*` of the effective configuration
    pub conf: ConfigStore,
    pub etc_dir: PathBuf,
    pub templates_dir: PathBuf,
    /// Resolved dependencies: name -> installed version
    pub dependencies: BTreeMap<String, String>,
}

impl PluginContext {
    /// Path under the managed system's configuration directory
    pub fn etc_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.etc_dir.join(rel)
    }
}

/// Behaviour every plugin provides
pub trait Plugin {
    fn version(&self) -> &str;

    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Key types declared on the configuration view before use
    fn conf_types(&self, _ctx: &PluginContext) -> Vec<ConfType> {
        Vec::new()
    }

    fn services_to_restart(&self) -> Vec<String> {
        Vec::new()
    }

    fn services_to_reload(&self) -> Vec<String> {
        Vec::new()
    }

    /// Files this plugin generates
    fn conf_files_path(&self, ctx: &PluginContext) -> Vec<PathBuf>;

    /// Existing files to move aside before writing
    fn files_to_backup_path(&self, _ctx: &PluginContext) -> Vec<PathBuf> {
        Vec::new()
    }

    fn file_content(&self, ctx: &PluginContext, path: &Path) -> Result<String>;
}

/// A constructed plugin and its configuration view
pub struct PluginInstance {
    ctx: PluginContext,
    plugin: Box<dyn Plugin>,
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.ctx.name)
            .field("version", &self.plugin.version())
            .finish()
    }
}

impl PluginInstance {
    /// Wrap `plugin`, declaring its key types on the configuration view
    pub fn new(mut ctx: PluginContext, plugin: Box<dyn Plugin>) -> Result<Self> {
        for conf_type in plugin.conf_types(&ctx) {
            ctx.conf
                .set_type(&conf_type.section, &conf_type.key, conf_type.tag)?;
        }
        Ok(Self { ctx, plugin })
    }

    pub fn name(&self) -> &str {
        &self.ctx.name
    }

    pub fn version(&self) -> &str {
        self.plugin.version()
    }

    pub fn context(&self) -> &PluginContext {
        &self.ctx
    }

    pub fn conf(&self) -> &ConfigStore {
        &self.ctx.conf
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.plugin.dependencies()
    }

    /// Resolved dependency versions, by name
    pub fn resolved_dependencies(&self) -> &BTreeMap<String, String> {
        &self.ctx.dependencies
    }

    pub(crate) fn attach_dependency(&mut self, name: &str, version: &str) {
        self.ctx
            .dependencies
            .insert(name.to_string(), version.to_string());
    }

    pub fn services_to_restart(&self) -> Vec<String> {
        self.plugin.services_to_restart()
    }

    pub fn services_to_reload(&self) -> Vec<String> {
        self.plugin.services_to_reload()
    }

    /// Generated files with their content
    pub fn conf_files(&self) -> Result<Vec<ManagedFile>> {
        self.plugin
            .conf_files_path(&self.ctx)
            .into_iter()
            .map(|path| {
                let content = self.plugin.file_content(&self.ctx, &path)?;
                Ok(ManagedFile::generated(path, content, self.name()))
            })
            .collect()
    }

    pub fn files_to_backup(&self) -> Vec<ManagedFile> {
        self.plugin
            .files_to_backup_path(&self.ctx)
            .into_iter()
            .map(|path| ManagedFile::backup_candidate(path, self.name()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionOp;
    use strata_core::Value;

    struct Motd;

    impl Plugin for Motd {
        fn version(&self) -> &str {
            "1.0"
        }

        fn conf_types(&self, ctx: &PluginContext) -> Vec<ConfType> {
            vec![ConfType::new(&ctx.name, "lines", TypeTag::List)]
        }

        fn conf_files_path(&self, ctx: &PluginContext) -> Vec<PathBuf> {
            vec![ctx.etc_path("motd")]
        }

        fn file_content(&self, ctx: &PluginContext, _path: &Path) -> Result<String> {
            let lines = ctx.conf.get(&ctx.name, "lines_list")?;
            Ok(lines.as_list().unwrap_or_default().join("\n") + "\n")
        }
    }

    fn context(conf: &str) -> PluginContext {
        PluginContext {
            name: "motd".to_string(),
            conf: ConfigStore::parse(conf).unwrap(),
            etc_dir: PathBuf::from("/etc"),
            templates_dir: PathBuf::from("/templates"),
            dependencies: BTreeMap::new(),
        }
    }

    #[test]
    fn test_instance_declares_types_and_generates_files() {
        let instance =
            PluginInstance::new(context("[motd]\nlines = hello, world\n"), Box::new(Motd)).unwrap();

        assert_eq!(
            instance.conf().get("motd", "lines_list").unwrap(),
            Value::List(vec!["hello".to_string(), "world".to_string()])
        );

        let files = instance.conf_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("/etc/motd"));
        assert_eq!(files[0].content.as_deref(), Some("hello\nworld\n"));
        assert_eq!(files[0].plugin, "motd");
        assert!(!files[0].written && !files[0].backed_up);
        assert!(instance.files_to_backup().is_empty());
    }

    #[test]
    fn test_missing_key_surfaces_as_core_error() {
        let instance = PluginInstance::new(context("[motd]\n"), Box::new(Motd)).unwrap();
        assert!(matches!(
            instance.conf_files(),
            Err(PluginError::Core(ref e)) if e.is_not_found()
        ));
    }

    #[test]
    fn test_dependency_verify_reports_failed_requirement() {
        let dependency = Dependency::new("base")
            .requiring(Requirement::new(VersionOp::Ge, "1.0"))
            .requiring(Requirement::new(VersionOp::Lt, "2.0"));

        assert!(dependency.verify("motd", "1.5").is_ok());
        match dependency.verify("motd", "2.1") {
            Err(PluginError::BadVersion {
                op,
                required,
                actual,
                ..
            }) => {
                assert_eq!(op, "<");
                assert_eq!(required, "2.0");
                assert_eq!(actual, "2.1");
            }
            other => panic!("expected BadVersion, got {:?}", other),
        }
    }
}
