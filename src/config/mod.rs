//! Configuration for dropdock.
//!
//! Settings are read from the environment, with a `.env` file in the working
//! directory loaded first by the binary. Every value has a default, so an
//! empty environment yields a working configuration.

mod docker;
pub(crate) mod helpers;
mod reconcile;
mod storage;

pub use docker::DockerConfig;
pub use reconcile::ReconcileConfig;
pub use storage::{StorageConfig, StoreBackend, default_data_dir};

use crate::error::ConfigError;

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub docker: DockerConfig,
    pub storage: StorageConfig,
    pub reconcile: ReconcileConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            docker: DockerConfig::resolve()?,
            storage: StorageConfig::resolve()?,
            reconcile: ReconcileConfig::resolve()?,
        })
    }

    /// Configuration suitable for tests: in-memory storage, defaults elsewhere.
    pub fn for_testing(data_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            docker: DockerConfig::default(),
            storage: StorageConfig {
                backend: StoreBackend::Memory,
                data_dir: data_dir.into(),
            },
            reconcile: ReconcileConfig::default(),
        }
    }
}
