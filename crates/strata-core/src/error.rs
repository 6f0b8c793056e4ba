//! Error types for strata-core

use std::path::PathBuf;
use thiserror::Error;

use crate::value::TypeTag;

/// Result type alias using strata-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the typed value codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// One side of a conversion must be the string form
    #[error("Cannot convert from {from} to {to}: one side must be str")]
    BadType { from: TypeTag, to: TypeTag },

    /// Not a known boolean word
    #[error("Invalid boolean value \"{value}\"")]
    StrToBool { value: String },

    /// Not an unsigned integer with an optional k/M/G/T suffix
    #[error("Invalid size value \"{value}\"")]
    StrToSize { value: String },

    /// Type name not in the supported set
    #[error("Unknown type \"{name}\"")]
    UnknownType { name: String },
}

/// Core error types for strata
#[derive(Error, Debug)]
pub enum Error {
    /// Typed value conversion failed
    #[error("Conversion error on key {key}: {source}")]
    Conversion {
        key: String,
        #[source]
        source: ConversionError,
    },

    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration path does not exist
    #[error("{path}: No such file or directory")]
    NotFound { path: PathBuf },

    /// A file was expected but a directory was found
    #[error("{path}: Is a directory")]
    IsDirectory { path: PathBuf },

    /// A directory or `.conf` file was expected
    #[error("{path}: Not a directory")]
    NotConfFile { path: PathBuf },

    /// Section text could not be parsed
    #[error("Parse error in {path} line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Section does not exist
    #[error("Section \"{section}\" not found")]
    SectionNotFound { section: String },

    /// Key does not exist
    #[error("Key \"{key}\" not found in section \"{section}\"")]
    KeyNotFound { section: String, key: String },

    /// A raw key collides with the typed alias of a declared key
    #[error("Key \"{alias}\" collides with the typed alias of key \"{key}\"")]
    TypedAliasConflict { key: String, alias: String },

    /// Two profiles at the same position disagree on a value
    #[error("Profiles \"{first}\" and \"{second}\" both define key \"{key}\" of section \"{section}\" with different values")]
    ProfileConflict {
        first: String,
        second: String,
        section: String,
        key: String,
    },

    /// Value already present in a list key
    #[error("The value \"{value}\" is already in key {key} of section {section}")]
    ListValueAlreadyExists {
        section: String,
        key: String,
        value: String,
    },

    /// Value absent from a list key
    #[error("The value \"{value}\" is not in key {key} of section {section}")]
    ListValueNotFound {
        section: String,
        key: String,
        value: String,
    },

    /// Key only exists in a parent layer and inheriting was refused
    #[error("The key \"{key}\" in section \"{section}\" does not exist in local configuration, but exists in {layer} configuration. To force, first set the value to \"\" before adding to the list")]
    ExistsInParent {
        section: String,
        key: String,
        layer: String,
    },

    /// Section name outside of the scope of its fragment file
    #[error("Unauthorized section \"{section}\": all sections should be either \"{scope}\" or \"{scope}:<subsection>\"")]
    UnauthorizedSection { section: String, scope: String },

    /// Profile file missing
    #[error("Profile not installed: {name}")]
    ProfileNotInstalled { name: String },

    /// Profile already active
    #[error("Profile {name} already enabled at level {level}")]
    ProfileAlreadyEnabled { name: String, level: u32 },

    /// Profile not active
    #[error("Profile not enabled: {name}")]
    ProfileNotEnabled { name: String },

    /// Manager settings are incomplete or invalid
    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },
}

impl Error {
    /// Create an IO error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a conversion error for a key
    pub fn conversion(key: impl Into<String>, source: ConversionError) -> Self {
        Self::Conversion {
            key: key.into(),
            source,
        }
    }

    /// Create a key not found error
    pub fn key_not_found(section: impl Into<String>, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            section: section.into(),
            key: key.into(),
        }
    }

    /// Create a section not found error
    pub fn section_not_found(section: impl Into<String>) -> Self {
        Self::SectionNotFound {
            section: section.into(),
        }
    }

    /// Create an invalid setting error
    pub fn invalid_setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error means "the key or section is absent"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. } | Self::SectionNotFound { .. })
    }
}
