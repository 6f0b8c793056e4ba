use std::path::{Path, PathBuf};

use strata_core::TypeTag;

use super::{builtin_version, list_items};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::plugin::{ConfType, Dependency, Plugin, PluginContext};

const HOSTS_FILE: &str = "hosts";

/// Generates the static host table from `[hosts]`
///
/// `hostname` and `domain` name the machine itself, `entries` is a sequence
/// of verbatim `address name...` lines.
#[derive(Debug, Clone)]
pub struct Hosts {
    version: String,
    dependencies: Vec<Dependency>,
}

impl Hosts {
    pub fn new(descriptor: &Descriptor) -> Self {
        Self {
            version: builtin_version(descriptor),
            dependencies: descriptor.dependencies.clone(),
        }
    }
}

impl Plugin for Hosts {
    fn version(&self) -> &str {
        &self.version
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies.clone()
    }

    fn conf_types(&self, ctx: &PluginContext) -> Vec<ConfType> {
        vec![ConfType::new(&ctx.name, "entries", TypeTag::Sequence)]
    }

    fn conf_files_path(&self, ctx: &PluginContext) -> Vec<PathBuf> {
        vec![ctx.etc_path(HOSTS_FILE)]
    }

    fn files_to_backup_path(&self, ctx: &PluginContext) -> Vec<PathBuf> {
        vec![ctx.etc_path(HOSTS_FILE)]
    }

    fn file_content(&self, ctx: &PluginContext, _path: &Path) -> Result<String> {
        let section = ctx.conf.section(&ctx.name);
        let raw = |key: &str| {
            section
                .and_then(|s| s.get_raw(key))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let mut out = String::from("# Generated by strata, local changes will be lost\n");
        out.push_str("127.0.0.1\tlocalhost\n");
        out.push_str("::1\tlocalhost ip6-localhost ip6-loopback\n");
        match (raw("hostname"), raw("domain")) {
            (Some(host), Some(domain)) => {
                out.push_str(&format!("127.0.1.1\t{}.{} {}\n", host, domain, host));
            }
            (Some(host), None) => {
                out.push_str(&format!("127.0.1.1\t{}\n", host));
            }
            _ => {}
        }

        let entries = list_items(ctx, "entries", TypeTag::Sequence)?;
        if !entries.is_empty() {
            out.push_str("\n# Custom hosts definitions\n");
            for entry in entries {
                out.push_str(&entry);
                out.push('\n');
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginInstance;
    use std::collections::BTreeMap;
    use strata_core::ConfigStore;

    fn instance(conf: &str) -> PluginInstance {
        let descriptor = Descriptor::from_store(
            "hosts",
            Path::new("hosts.conf"),
            &ConfigStore::parse("[plugin]\nversion = 2.1\n").unwrap(),
        )
        .unwrap();
        let ctx = PluginContext {
            name: "hosts".to_string(),
            conf: ConfigStore::parse(conf).unwrap(),
            etc_dir: PathBuf::from("/etc"),
            templates_dir: PathBuf::from("/tpl"),
            dependencies: BTreeMap::new(),
        };
        PluginInstance::new(ctx, Box::new(Hosts::new(&descriptor))).unwrap()
    }

    #[test]
    fn test_hosts_file() {
        let hosts = instance(
            "[hosts]\nhostname = edge1\ndomain = example.net\n\
             entries-1 = 10.0.0.2 db\nentries-0 = 10.0.0.1 gw\n",
        );
        assert_eq!(hosts.version(), "2.1");

        let content = hosts.conf_files().unwrap().remove(0).content.unwrap();
        assert!(content.contains("127.0.1.1\tedge1.example.net edge1\n"));
        assert!(content.ends_with("# Custom hosts definitions\n10.0.0.1 gw\n10.0.0.2 db\n"));
    }

    #[test]
    fn test_hosts_without_entries() {
        let content = instance("[hosts]\nhostname = edge1\n")
            .conf_files()
            .unwrap()
            .remove(0)
            .content
            .unwrap();
        assert!(content.ends_with("127.0.1.1\tedge1\n"));
        assert!(!content.contains("Custom"));
    }

    #[test]
    fn test_backs_up_generated_file() {
        let hosts = instance("");
        let backup = hosts.files_to_backup();
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0].path, PathBuf::from("/etc/hosts"));
        assert!(backup[0].content.is_none());
    }
}
