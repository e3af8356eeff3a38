//! Error types for platform table operations.

use std::path::PathBuf;

/// Errors that can occur while loading or resolving platform tables.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading/writing target files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Target file not found.
    #[error("target file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// No capacity/alternative table exists for the requested platform.
    #[error("unknown platform '{name}' (known platforms: {known})")]
    UnknownPlatform {
        /// The platform string as given by the caller.
        name: String,
        /// Comma-separated list of platforms the catalog knows.
        known: String,
    },

    /// A resource type name that is not part of [`crate::ResourceType`].
    #[error("unknown resource type '{0}'")]
    UnknownResourceType(String),

    /// Validation error in a profile definition.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;
