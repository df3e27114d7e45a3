use crate::config::helpers::{optional_env, parse_optional_env};
use crate::error::ConfigError;

/// Docker engine connection settings.
///
/// The endpoint itself follows bollard's local defaults (`DOCKER_HOST`, then
/// the platform socket); only the knobs bollard does not read are here.
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Request timeout in seconds for every engine call.
    pub timeout_secs: u64,
    /// Explicit socket path, overriding the default lookup.
    pub socket: Option<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            socket: None,
        }
    }
}

impl DockerConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            timeout_secs: parse_optional_env("DROPDOCK_DOCKER_TIMEOUT_SECS", defaults.timeout_secs)?,
            socket: optional_env("DROPDOCK_DOCKER_SOCKET")?.filter(|s| !s.is_empty()),
        })
    }
}
