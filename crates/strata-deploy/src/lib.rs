//! Transactional deployment for strata
//!
//! A deployment resolves the enabled plugins, backs up the files they
//! replace, writes the generated files, restarts the requested services and
//! archives the backup. Any failure on the way restores the previous state.

pub mod backup;
pub mod error;
pub mod manager;
pub mod services;
pub mod transaction;

pub use backup::BackupDir;
pub use error::{DeployError, Result};
pub use manager::Manager;
pub use services::{CommandServiceManager, ServiceAction, ServiceManager};
pub use transaction::{
    DeployOptions, DeployReport, DeployState, Deployer, ServicePlan, ALL_PLUGINS,
};
