//! Common test utilities for strata-deploy
//!
//! Builds a complete managed tree in a temporary directory: configuration
//! root, plugin descriptors, templates, the etc directory and the backup
//! root, plus a service manager that records what it was asked to do.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use strata_core::Settings;
use strata_deploy::{DeployError, Manager, ServiceAction, ServiceManager};
use tempfile::TempDir;

pub struct DeployTree {
    temp_dir: TempDir,
}

impl DeployTree {
    pub fn new() -> Self {
        let tree = Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        };
        fs::create_dir_all(tree.etc()).expect("Failed to create etc directory");
        tree
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn etc(&self) -> PathBuf {
        self.path().join("etc")
    }

    pub fn backups(&self) -> PathBuf {
        self.path().join("backups")
    }

    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write fixture");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path().join(rel)).expect("Failed to read file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path().join(rel).exists()
    }

    pub fn base(&self, content: &str) -> &Self {
        self.write("conf/base.conf", content)
    }

    pub fn local(&self, content: &str) -> &Self {
        self.write("conf/local.conf", content)
    }

    pub fn plugin(&self, name: &str, descriptor: &str) -> &Self {
        self.write(&format!("plugins/{}.conf", name), descriptor)
    }

    pub fn template(&self, name: &str, content: &str) -> &Self {
        self.write(&format!("templates/{}", name), content)
    }

    /// Entries of the backup root, sorted
    pub fn backup_entries(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.backups()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn settings(&self, enabled: &[&str]) -> Settings {
        let mut settings = Settings::defaults(self.path().join("strata.conf"));
        settings.base_dir = self.path().join("conf");
        settings.etc_dir = self.etc();
        settings.backup_dir = self.backups();
        settings.plugins_path = self.path().join("plugins");
        settings.templates_path = self.path().join("templates");
        for name in enabled {
            settings.enable_plugin(name).expect("Failed to enable plugin");
        }
        settings
    }

    pub fn manager(&self, enabled: &[&str], services: &RecordingServices) -> Manager {
        Manager::open(self.settings(enabled))
            .expect("Failed to open manager")
            .with_service_manager(Box::new(services.clone()))
    }
}

/// Service manager recording calls, failing on one chosen service
#[derive(Clone, Default)]
pub struct RecordingServices {
    calls: Rc<RefCell<Vec<(String, ServiceAction)>>>,
    failing: Rc<RefCell<Option<String>>>,
}

impl RecordingServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, service: &str) {
        *self.failing.borrow_mut() = Some(service.to_string());
    }

    pub fn calls(&self) -> Vec<(String, ServiceAction)> {
        self.calls.borrow().clone()
    }
}

impl ServiceManager for RecordingServices {
    fn run(&self, service: &str, action: ServiceAction) -> strata_deploy::Result<()> {
        self.calls.borrow_mut().push((service.to_string(), action));
        if self.failing.borrow().as_deref() == Some(service) {
            return Err(DeployError::service(service, action, "exited with status 1"));
        }
        Ok(())
    }
}
