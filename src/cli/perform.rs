//! Drop dispatch and direct apply from the command line.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::context::DropContext;
use crate::performer::{Capability, DropRegistry, Performer};
use crate::state::ContainerSpec;

async fn connect(config: Config) -> anyhow::Result<Arc<DropContext>> {
    let context = DropContext::connect(config).await?;
    Ok(Arc::new(context))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report whether `drop` can perform `action`.
pub async fn run_can_perform_command(
    config: Config,
    registry: &DropRegistry,
    drop: &str,
    action: &str,
    args: Vec<String>,
) -> anyhow::Result<()> {
    let context = connect(config).await?;
    let performer = Performer::new(drop, args, registry, context);

    let capability = performer.can_perform(action).await;
    print_json(&capability)?;
    require_capability(&capability, action)
}

/// Turn a denied capability into an error carrying its reason.
fn require_capability(capability: &Capability, action: &str) -> anyhow::Result<()> {
    if capability.ok {
        return Ok(());
    }
    anyhow::bail!(
        "{}",
        capability
            .reason
            .clone()
            .unwrap_or_else(|| format!("Cannot perform {}", action))
    )
}

/// Check, then run, `action` on `drop`.
pub async fn run_perform_command(
    config: Config,
    registry: &DropRegistry,
    drop: &str,
    action: &str,
    args: Vec<String>,
) -> anyhow::Result<()> {
    let context = connect(config).await?;
    let performer = Performer::new(drop, args, registry, context);

    require_capability(&performer.can_perform(action).await, action)?;

    let output = performer.perform(action).await?;
    tracing::debug!("{} on '{}' took {:?}", action, drop, output.duration);
    print_json(&output.result)
}

/// Converge the scope's container to the spec at `spec_path`.
pub async fn run_apply_command(
    config: Config,
    spec_path: &Path,
    namespace: Option<String>,
) -> anyhow::Result<()> {
    let spec = ContainerSpec::load(spec_path)?;
    let namespace = namespace.unwrap_or_else(|| config.reconcile.default_namespace.clone());

    let context = connect(config).await?;
    let scope = context.scope(&namespace)?;
    let outcome = context.state(&scope).apply(&scope, &spec).await?;

    print_json(&outcome)
}
