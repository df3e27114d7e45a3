use std::path::PathBuf;

use crate::config::helpers::optional_env;
use crate::error::ConfigError;

/// Which `ScopeStore` implementation backs each scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// One JSON document per namespace under the data directory.
    File,
    /// Process-local; container ids are forgotten on exit.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("must be 'file' or 'memory', got '{}'", s)),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::File => write!(f, "file"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Scope storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    /// Directory holding per-namespace state files.
    pub data_dir: PathBuf,
}

/// Default data directory: `<platform data dir>/dropdock`.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("dropdock"))
}

impl StorageConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let backend = optional_env("DROPDOCK_STORE")?
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<StoreBackend>())
            .transpose()
            .map_err(|message| ConfigError::InvalidValue {
                key: "DROPDOCK_STORE".to_string(),
                message,
            })?
            .unwrap_or(StoreBackend::File);

        let data_dir = match optional_env("DROPDOCK_DATA_DIR")?.filter(|s| !s.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self { backend, data_dir })
    }
}
