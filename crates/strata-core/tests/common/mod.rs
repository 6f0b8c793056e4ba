//! Common test utilities for strata-core
//!
//! Provides an on-disk configuration root in a temporary directory with
//! helpers to write base fragments, profiles and the local layer.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary configuration root
pub struct ConfRoot {
    temp_dir: TempDir,
}

impl ConfRoot {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file relative to the root, creating parent directories
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    /// `base.conf` as a single file
    pub fn base(&self, content: &str) -> &Self {
        self.write("base.conf", content);
        self
    }

    /// `base/<name>.conf` fragment
    pub fn base_fragment(&self, name: &str, content: &str) -> &Self {
        self.write(&format!("base/{}.conf", name), content);
        self
    }

    pub fn profile(&self, name: &str, content: &str) -> &Self {
        self.write(&format!("profiles/{}.conf", name), content);
        self
    }

    pub fn local(&self, content: &str) -> &Self {
        self.write("local.conf", content);
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path().join(rel)).expect("Failed to read file")
    }
}
