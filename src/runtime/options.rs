//! Container creation options.
//!
//! Field names follow the engine's create body (`Image`, `Env`, ...) so spec
//! files read like the API they drive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Options passed to `RuntimeClient::create_container`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateOptions {
    /// Container name; the engine assigns one when absent.
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Image reference. Required before any create is attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Environment entries in `KEY=value` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Exposed ports keyed as `port/proto`; values are ignored.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exposed_ports: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_config: Option<HostOptions>,
}

impl CreateOptions {
    /// Options for the given image with everything else defaulted.
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            ..Default::default()
        }
    }

    /// The image reference, if present and not blank.
    pub fn image_ref(&self) -> Option<&str> {
        self.image
            .as_deref()
            .map(str::trim)
            .filter(|image| !image.is_empty())
    }
}

/// Host-side settings for a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostOptions {
    /// Bind mounts in `host:container[:opts]` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binds: Vec<String>,

    /// Port bindings keyed as `port/proto`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub port_bindings: BTreeMap<String, Vec<PortBindingOptions>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,
}

/// A single host port binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBindingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_rejects_blank() {
        assert_eq!(CreateOptions::default().image_ref(), None);
        assert_eq!(CreateOptions::with_image("  ").image_ref(), None);
        assert_eq!(
            CreateOptions::with_image("test-image").image_ref(),
            Some("test-image")
        );
    }

    #[test]
    fn test_deserializes_engine_field_names() {
        let options: CreateOptions = serde_json::from_value(serde_json::json!({
            "name": "web",
            "Image": "nginx:1.27",
            "Env": ["MODE=prod"],
            "ExposedPorts": { "80/tcp": {} },
            "HostConfig": {
                "PortBindings": { "80/tcp": [{ "HostPort": "8080" }] }
            }
        }))
        .unwrap();

        assert_eq!(options.name.as_deref(), Some("web"));
        assert_eq!(options.image_ref(), Some("nginx:1.27"));
        assert_eq!(options.env, vec!["MODE=prod".to_string()]);
        assert!(options.exposed_ports.contains_key("80/tcp"));
        let host = options.host_config.unwrap();
        assert_eq!(
            host.port_bindings["80/tcp"][0].host_port.as_deref(),
            Some("8080")
        );
    }

    #[test]
    fn test_empty_object_has_no_image() {
        let options: CreateOptions = serde_json::from_str("{}").unwrap();
        assert!(options.image_ref().is_none());
    }
}
