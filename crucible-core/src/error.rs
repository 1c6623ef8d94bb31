//! Error types.

use std::io;
use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

/// Crate-wide error type.
///
/// Composition and assembly failures are raised at the point of detection
/// and surfaced to the command line boundary unhandled. A misconfigured
/// training job must never run partially, so there is no retry and no
/// silent recovery anywhere in this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no config profile named: {0}")]
    ConfigNotFound(String),
    #[error("override targets unknown field: {0}")]
    UnknownField(String),
    #[error("field not defined anywhere in composition: {0}")]
    MissingField(String),
    #[error("field {field}: expected {expected}, found {found}")]
    FieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("resource field must be a positive integer: {field} = {value}")]
    InvalidResourceSpec { field: String, value: i64 },
    #[error("horizon field {field} must be a positive integer or \"unbounded\": {value}")]
    InvalidHorizon { field: String, value: String },

    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("no checkpoint found at: {}", .0.display())]
    CheckpointNotFound(PathBuf),

    #[error("io error: {0}")]
    IoError(String),
    #[error("toml serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDeserError(#[from] toml::de::Error),

    #[error("other error: {0}")]
    Other(String),
}
