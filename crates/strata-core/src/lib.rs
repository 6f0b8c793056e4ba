//! # strata-core
//!
//! Core library for strata providing:
//! - Typed values stored as strings (list, bool, size, sequence)
//! - Section stores loaded from `.conf` files and fragment directories
//! - The base < profiles < local layered configuration
//! - Edits of the local layer
//! - Manager settings

pub mod error;
pub mod fs;
pub mod layers;
pub mod mutation;
pub mod parser;
pub mod section;
pub mod sequence;
pub mod settings;
pub mod store;
pub mod value;

pub use error::{ConversionError, Error, Result};
pub use layers::{Layer, LayeredConfig, Layout, ProfileInfo, DEFAULT_PROFILE_LEVEL};
pub use mutation::ParentPolicy;
pub use section::ConfigSection;
pub use settings::{Settings, DEFAULT_SETTINGS_PATH};
pub use store::{ConfigStore, TypedView};
pub use value::{TypeTag, Value};
