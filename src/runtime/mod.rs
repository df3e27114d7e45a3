//! Container engine access.
//!
//! Reconciliation talks to the engine only through the [`RuntimeClient`]
//! trait. Responses are reduced to what the decisions need: does the
//! container exist, did create fail for a missing image, did a pull report
//! an error inside an otherwise successful response.
//!
//! [`DockerRuntime`] implements the trait over the Docker Engine API with
//! bollard.

mod docker;
mod error;
mod image;
mod options;

pub use docker::{DockerRuntime, connect_docker};
pub use error::{NotFoundKind, Result, RuntimeError};
pub use image::{DEFAULT_TAG, ImageRef};
pub use options::{CreateOptions, HostOptions, PortBindingOptions};

use async_trait::async_trait;
use serde::Serialize;

/// What the engine reports about an existing container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub running: bool,
}

/// One progress record from an image pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullProgress {
    pub status: Option<String>,
    /// In-band failure text. The engine can report a failed pull this way
    /// while the HTTP exchange itself succeeded.
    pub error: Option<String>,
}

impl PullProgress {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: None,
            error: Some(error.into()),
        }
    }
}

/// Everything an image pull returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub image: String,
    pub records: Vec<PullProgress>,
}

impl PullReport {
    /// The first in-band error, if any record carried one.
    pub fn error(&self) -> Option<&str> {
        self.records.iter().find_map(|r| r.error.as_deref())
    }

    /// The last status line, typically the final summary.
    pub fn last_status(&self) -> Option<&str> {
        self.records.iter().rev().find_map(|r| r.status.as_deref())
    }
}

/// Client for a container engine's control API.
///
/// Implementations must report a missing container from `inspect_container`
/// and a missing image from `create_container` as
/// [`RuntimeError::NotFound`] with the matching kind, and transport failures
/// as [`RuntimeError::Connectivity`].
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Inspect a container by id or name.
    async fn inspect_container(&self, id: &str) -> Result<ContainerInfo>;

    /// Create a container and return its id.
    async fn create_container(&self, options: &CreateOptions) -> Result<String>;

    /// Pull an image. Transport success does not imply pull success; check
    /// [`PullReport::error`].
    async fn pull_image(&self, image: &str) -> Result<PullReport>;

    /// Start a created or stopped container. Starting a running container
    /// is not an error.
    async fn start_container(&self, id: &str) -> Result<()>;
}
