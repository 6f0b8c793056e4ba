//! Error types for strata-deploy

use std::path::PathBuf;
use thiserror::Error;

use crate::services::ServiceAction;

/// Result type alias using strata-deploy's DeployError
pub type Result<T> = std::result::Result<T, DeployError>;

/// Deployment errors
#[derive(Error, Debug)]
pub enum DeployError {
    /// Plugin resolution or rendering failed
    #[error(transparent)]
    Plugin(#[from] strata_plugins::PluginError),

    /// Configuration error
    #[error(transparent)]
    Core(#[from] strata_core::Error),

    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Service command failed or could not be started
    #[error("Failed to {action} service {service}: {message}")]
    Service {
        service: String,
        action: ServiceAction,
        message: String,
    },

    /// A backed-up file could not be moved back into place
    #[error("Could not restore {path}: {source}")]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Deployment failed and the rollback could not undo everything
    #[error("{source}\nRollback incomplete: {restore}\nThe backup directory {backup_dir} was kept, restore the remaining files from it manually")]
    RollbackIncomplete {
        #[source]
        source: Box<DeployError>,
        restore: Box<DeployError>,
        backup_dir: PathBuf,
    },
}

impl DeployError {
    /// Create an IO error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a service error
    pub fn service(
        service: impl Into<String>,
        action: ServiceAction,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            service: service.into(),
            action,
            message: message.into(),
        }
    }

    /// The error that triggered a rollback, or `self`
    pub fn original(&self) -> &DeployError {
        match self {
            Self::RollbackIncomplete { source, .. } => source.original(),
            other => other,
        }
    }
}
