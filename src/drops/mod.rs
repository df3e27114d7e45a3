//! Builtin drops.

pub mod container;

use std::sync::Arc;

pub use container::{ContainerArgs, ContainerDrop};

use crate::context::DropContext;
use crate::performer::{DropFactory, DropRegistry, DropUnit, Result};

struct ContainerFactory;

impl DropFactory for ContainerFactory {
    fn build(&self, argv: &[String], context: &Arc<DropContext>) -> Result<Box<dyn DropUnit>> {
        Ok(Box::new(ContainerDrop::build(argv, context)?))
    }

    fn description(&self) -> &str {
        "Reconcile one container per scope from a YAML or JSON spec (up, status, forget)"
    }
}

/// Register every builtin drop in `registry`.
pub fn register_builtins(registry: &mut DropRegistry) {
    registry.register(container::NAME, Arc::new(ContainerFactory));
}
