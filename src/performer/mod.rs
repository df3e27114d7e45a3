//! Capability-gated drop dispatch.
//!
//! A [`Performer`] is bound to one drop name. The drop is built from its
//! registered factory on the first [`can_perform`](Performer::can_perform)
//! or [`perform`](Performer::perform) and then reused for the lifetime of
//! the performer.
//!
//! Callers check `can_perform` before `perform`. `perform` does not
//! validate the action first; an undefined action comes back as
//! [`PerformError::UndefinedAction`] from the drop itself.

mod error;
mod registry;

pub use error::{PerformError, Result};
pub use registry::{ActionOutput, DropFactory, DropRegistry, DropUnit, undefined_action};

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;

use crate::context::DropContext;

/// Whether an action can run, and why not when it cannot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Capability {
    pub fn allowed() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Dispatcher for one named drop.
pub struct Performer {
    drop_name: String,
    argv: Vec<String>,
    context: Arc<DropContext>,
    factory: Option<Arc<dyn DropFactory>>,
    instance: OnceCell<Box<dyn DropUnit>>,
}

impl Performer {
    /// Resolve `drop_name` in `registry`. An unknown name is not an error
    /// here; it is reported by `can_perform`.
    pub fn new(
        drop_name: impl Into<String>,
        argv: Vec<String>,
        registry: &DropRegistry,
        context: Arc<DropContext>,
    ) -> Self {
        let drop_name = drop_name.into();
        let factory = registry.get(&drop_name);
        Self {
            drop_name,
            argv,
            context,
            factory,
            instance: OnceCell::new(),
        }
    }

    pub fn drop_name(&self) -> &str {
        &self.drop_name
    }

    /// Whether the drop has been built.
    pub fn is_built(&self) -> bool {
        self.instance.initialized()
    }

    /// Build the drop on first use; later calls return the same instance.
    async fn build(&self) -> Result<&dyn DropUnit> {
        let factory = self.factory.as_ref().ok_or_else(|| PerformError::NoFactory {
            drop_name: self.drop_name.clone(),
        })?;

        let instance = self
            .instance
            .get_or_try_init(|| async {
                tracing::debug!("Building drop '{}'", self.drop_name);
                factory.build(&self.argv, &self.context)
            })
            .await?;

        Ok(instance.as_ref())
    }

    /// Report whether `action` can be performed.
    pub async fn can_perform(&self, action: &str) -> Capability {
        match self.build().await {
            Ok(drop) if drop.defines(action) => Capability::allowed(),
            Ok(_) => Capability::denied(format!("Drop does not define {}", action)),
            Err(e) => Capability::denied(e.to_string()),
        }
    }

    /// Run `action` on the drop, building it first if needed.
    pub async fn perform(&self, action: &str) -> Result<ActionOutput> {
        let drop = self.build().await?;
        tracing::info!("Performing {} on drop '{}'", action, self.drop_name);
        drop.perform(action).await
    }
}
