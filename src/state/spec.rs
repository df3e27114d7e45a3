//! Desired container state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::runtime::CreateOptions;

/// What a scope's container should look like.
///
/// ```yaml
/// create:
///   name: web
///   Image: nginx:1.27
///   ExposedPorts: { "80/tcp": {} }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    #[serde(default)]
    pub create: CreateOptions,
}

impl ContainerSpec {
    pub fn new(create: CreateOptions) -> Self {
        Self { create }
    }

    /// Spec for an image with default create options.
    pub fn for_image(image: impl Into<String>) -> Self {
        Self::new(CreateOptions::with_image(image))
    }

    /// Load a spec from a YAML (`.yml`, `.yaml`) or JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"));

        let parsed: Result<Self, String> = if is_yaml {
            serde_yml::from_str(&raw).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&raw).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}
