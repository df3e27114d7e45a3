//! The `container` drop: one container per scope, declared in a spec file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use clap::Parser;
use serde::Serialize;
use serde_json::json;

use crate::context::DropContext;
use crate::performer::{ActionOutput, DropUnit, PerformError, Result, undefined_action};
use crate::runtime::NotFoundKind;
use crate::scope::Scope;
use crate::state::{ContainerSpec, State};

pub const NAME: &str = "container";

const ACTIONS: &[&str] = &["up", "status", "forget"];

/// Arguments accepted by the `container` drop.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "container", no_binary_name = true)]
pub struct ContainerArgs {
    /// YAML or JSON container spec. Required for `up`.
    pub spec: Option<PathBuf>,

    /// Scope the container belongs to.
    #[arg(short, long)]
    pub namespace: Option<String>,
}

/// Reconciles a scope's container against a spec file.
pub struct ContainerDrop {
    scope: Scope,
    state: State,
    spec: Option<ContainerSpec>,
}

impl ContainerDrop {
    /// Parse `argv`, open the scope, and load the spec if one was given.
    pub fn build(argv: &[String], context: &Arc<DropContext>) -> Result<Self> {
        let build_err = |reason: String| PerformError::Build {
            drop_name: NAME.to_string(),
            reason,
        };

        let args = ContainerArgs::try_parse_from(argv).map_err(|e| build_err(e.to_string()))?;

        let namespace = args
            .namespace
            .unwrap_or_else(|| context.config().reconcile.default_namespace.clone());
        let scope = context.scope(&namespace)?;

        let spec = match &args.spec {
            Some(path) => Some(ContainerSpec::load(path).map_err(|e| build_err(e.to_string()))?),
            None => None,
        };

        let state = context.state(&scope);
        Ok(Self { scope, state, spec })
    }

    async fn up(&self) -> Result<serde_json::Value> {
        let spec = self.spec.as_ref().ok_or_else(|| PerformError::Action {
            action: "up".to_string(),
            reason: "no spec file given".to_string(),
        })?;

        let outcome = self.state.apply(&self.scope, spec).await?;
        to_json("up", &outcome)
    }

    async fn status(&self) -> Result<serde_json::Value> {
        let handle = self.state.get_container().await?;
        let Some(id) = handle.id().map(str::to_string) else {
            return Ok(json!({ "namespace": self.scope.namespace(), "container": null }));
        };

        let container = match handle.inspect().await {
            Ok(info) => to_json("status", &info)?,
            Err(e) if e.is_not_found(NotFoundKind::Container) => {
                tracing::warn!("Stored container {} no longer exists", id);
                serde_json::Value::Null
            }
            Err(e) => return Err(PerformError::State(e.into())),
        };

        Ok(json!({
            "namespace": self.scope.namespace(),
            "id": id,
            "container": container,
        }))
    }

    async fn forget(&self) -> Result<serde_json::Value> {
        let previous = self.scope.container_id().await?;
        self.scope.clear_container_id().await?;
        if let Some(id) = &previous {
            tracing::info!(
                "Forgot container {} for scope '{}'",
                id,
                self.scope.namespace()
            );
        }
        Ok(json!({ "namespace": self.scope.namespace(), "forgotten": previous }))
    }
}

fn to_json<T: Serialize>(action: &str, value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| PerformError::Action {
        action: action.to_string(),
        reason: format!("could not serialize result: {}", e),
    })
}

#[async_trait]
impl DropUnit for ContainerDrop {
    fn actions(&self) -> &[&'static str] {
        ACTIONS
    }

    async fn perform(&self, action: &str) -> Result<ActionOutput> {
        let start = Instant::now();
        let result = match action {
            "up" => self.up().await?,
            "status" => self.status().await?,
            "forget" => self.forget().await?,
            other => return Err(undefined_action(NAME, other)),
        };
        Ok(ActionOutput::success(result, start.elapsed()))
    }
}
