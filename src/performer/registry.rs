//! Drop trait, factories, and the name-keyed registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::context::DropContext;
use crate::performer::error::{PerformError, Result};

/// Output from a drop action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutput {
    pub result: serde_json::Value,
    pub duration: Duration,
}

impl ActionOutput {
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }

    pub fn text(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            result: serde_json::Value::String(text.into()),
            duration,
        }
    }
}

/// A unit of work with named actions.
#[async_trait]
pub trait DropUnit: Send + Sync {
    /// Names of the actions this drop defines.
    fn actions(&self) -> &[&'static str];

    /// Whether `action` is one of [`actions`](Self::actions).
    fn defines(&self, action: &str) -> bool {
        self.actions().contains(&action)
    }

    /// Run an action. Undefined actions return
    /// [`PerformError::UndefinedAction`].
    async fn perform(&self, action: &str) -> Result<ActionOutput>;
}

/// Builds a drop from its arguments and the shared context.
pub trait DropFactory: Send + Sync {
    fn build(&self, argv: &[String], context: &Arc<DropContext>) -> Result<Box<dyn DropUnit>>;

    /// One-line summary shown by `dropdock drops`.
    fn description(&self) -> &str {
        ""
    }
}

impl<F> DropFactory for F
where
    F: Fn(&[String], &Arc<DropContext>) -> Result<Box<dyn DropUnit>> + Send + Sync,
{
    fn build(&self, argv: &[String], context: &Arc<DropContext>) -> Result<Box<dyn DropUnit>> {
        self(argv, context)
    }
}

/// Drop factories by name.
#[derive(Clone, Default)]
pub struct DropRegistry {
    factories: BTreeMap<String, Arc<dyn DropFactory>>,
}

impl DropRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the builtin drops.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::drops::register_builtins(&mut registry);
        registry
    }

    /// Register `factory` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn DropFactory>) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            tracing::debug!("Replaced drop factory '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DropFactory>> {
        self.factories.get(name).cloned()
    }

    /// Registered names with their descriptions, sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.factories
            .iter()
            .map(|(name, factory)| (name.as_str(), factory.description()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for DropRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropRegistry")
            .field("drops", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Build the error for an action a drop does not define.
pub fn undefined_action(drop_name: &str, action: &str) -> PerformError {
    PerformError::UndefinedAction {
        drop_name: drop_name.to_string(),
        action: action.to_string(),
    }
}
