//! Error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostgenError {
    #[error("File not found or unreadable: {path:?}: {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid value for {key} in [{section}]: {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("Failed to determine home directory")]
    NoHomeDir,

    #[error("Registry parse error: {0}")]
    Registry(#[from] ini::ParseError),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostgenError {
    /// Wrap an IO error that happened while reading `path`.
    pub fn missing(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HostgenError::MissingFile {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HostgenError>;
