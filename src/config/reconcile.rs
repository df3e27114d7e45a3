use crate::config::helpers::{optional_env, parse_optional_env};
use crate::error::ConfigError;

/// Reconciliation settings.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Maximum number of inspect/create passes per `apply`. Each pull of a
    /// missing image starts a new pass.
    pub max_passes: u32,
    /// Namespace used when a drop is not given one explicitly.
    pub default_namespace: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_passes: 3,
            default_namespace: "default".to_string(),
        }
    }
}

impl ReconcileConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_passes = parse_optional_env("DROPDOCK_MAX_APPLY_PASSES", defaults.max_passes)?;
        if max_passes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DROPDOCK_MAX_APPLY_PASSES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            max_passes,
            default_namespace: optional_env("DROPDOCK_DEFAULT_NAMESPACE")?
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.default_namespace),
        })
    }
}
