//! Steady-state convergence for a container that exists.

use std::sync::Arc;

use async_trait::async_trait;

use crate::runtime::{ContainerInfo, NotFoundKind, RuntimeClient, RuntimeError};
use crate::state::error::{Result, StateError};

/// A bound accessor for one container. Creating one makes no engine call.
#[derive(Clone)]
pub struct ContainerHandle {
    id: Option<String>,
    runtime: Arc<dyn RuntimeClient>,
}

impl ContainerHandle {
    pub fn new(id: Option<String>, runtime: Arc<dyn RuntimeClient>) -> Self {
        Self { id, runtime }
    }

    /// The container id, if the scope has one recorded.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn require_id(&self) -> std::result::Result<&str, RuntimeError> {
        self.id.as_deref().ok_or_else(|| RuntimeError::NotFound {
            kind: NotFoundKind::Container,
            message: "no container recorded for this scope".to_string(),
        })
    }

    /// Inspect the container. A handle without an id reports not-found
    /// without calling the engine.
    pub async fn inspect(&self) -> std::result::Result<ContainerInfo, RuntimeError> {
        let id = self.require_id()?;
        self.runtime.inspect_container(id).await
    }

    pub async fn start(&self) -> std::result::Result<(), RuntimeError> {
        let id = self.require_id()?;
        self.runtime.start_container(id).await
    }
}

impl std::fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("id", &self.id)
            .finish()
    }
}

/// The step run once a container is known to exist.
#[async_trait]
pub trait Ensure: Send + Sync {
    async fn ensure(&self, container: &ContainerHandle) -> Result<()>;
}

/// Start the container if it is not running.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnsureRunning;

#[async_trait]
impl Ensure for EnsureRunning {
    async fn ensure(&self, container: &ContainerHandle) -> Result<()> {
        let info = container.inspect().await?;
        if info.running {
            tracing::debug!("Container {} already running", info.id);
            return Ok(());
        }

        tracing::info!("Starting container {}", info.id);
        container.start().await?;

        let after = container.inspect().await?;
        if !after.running {
            return Err(StateError::Ensure {
                id: after.id,
                reason: "container exited right after start".to_string(),
            });
        }
        Ok(())
    }
}
