//! Service restart and reload

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{DeployError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Restart,
    Reload,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Restart => "restart",
            ServiceAction::Reload => "reload",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can restart or reload a named service
pub trait ServiceManager {
    fn run(&self, service: &str, action: ServiceAction) -> Result<()>;
}

/// Runs `<command> restart|reload <service>`
#[derive(Debug, Clone)]
pub struct CommandServiceManager {
    command: String,
}

impl CommandServiceManager {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ServiceManager for CommandServiceManager {
    fn run(&self, service: &str, action: ServiceAction) -> Result<()> {
        info!("{} {} {}", self.command, action, service);
        let output = duct::cmd(self.command.as_str(), [action.as_str(), service])
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()
            .map_err(|e| DeployError::service(service, action, e.to_string()))?;

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let message = if text.is_empty() {
                format!("exited with {}", output.status)
            } else {
                text
            };
            return Err(DeployError::service(service, action, message));
        }
        if !text.is_empty() {
            debug!("{}", text);
        }
        Ok(())
    }
}

/// Distinct services in first-seen order
pub(crate) fn dedup(services: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for service in services {
        if !seen.contains(&service) {
            seen.push(service);
        }
    }
    seen
}
