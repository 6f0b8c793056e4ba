//! Common test utilities for strata-plugins
//!
//! A temporary tree holding the plugins, templates and etc directories.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use strata_plugins::PluginRegistry;
use tempfile::TempDir;

pub struct PluginTree {
    temp_dir: TempDir,
}

impl PluginTree {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn etc(&self) -> PathBuf {
        self.path().join("etc")
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    /// Install a plugin descriptor
    pub fn plugin(&self, name: &str, descriptor: &str) -> &Self {
        self.write(&format!("plugins/{}.conf", name), descriptor);
        self
    }

    pub fn template(&self, name: &str, content: &str) -> &Self {
        self.write(&format!("templates/{}", name), content);
        self
    }

    pub fn registry(&self) -> PluginRegistry {
        PluginRegistry::new(
            self.path().join("plugins"),
            self.path().join("templates"),
            self.etc(),
        )
    }
}

pub fn names(enabled: &[&str]) -> Vec<String> {
    enabled.iter().map(|s| s.to_string()).collect()
}
