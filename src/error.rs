//! Crate-level error types.
//!
//! Each subsystem owns its error enum (`RuntimeError`, `StoreError`,
//! `StateError`, `PerformError`); this module holds the configuration error
//! shared by config resolution and spec loading, plus a top-level `Error`
//! that the library entry points return.

use std::path::PathBuf;

use thiserror::Error;

use crate::performer::PerformError;
use crate::runtime::RuntimeError;
use crate::scope::StoreError;
use crate::state::StateError;

/// Errors raised while resolving configuration or loading spec files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// A configuration or spec file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration or spec file could not be parsed.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// No usable data directory could be determined.
    #[error("No data directory available; set DROPDOCK_DATA_DIR")]
    NoDataDir,
}

/// Top-level error for library entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Perform(#[from] PerformError),
}

/// Result type for library entry points.
pub type Result<T> = std::result::Result<T, Error>;
