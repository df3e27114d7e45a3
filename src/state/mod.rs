//! Container reconciliation.
//!
//! [`State::apply`] converges a scope's container to a [`ContainerSpec`]
//! with as few engine calls as possible:
//!
//! ```text
//!            ┌────────────┐  found   ┌──────────┐
//!   ┌───────▶│ Inspecting │─────────▶│  ensure  │──▶ done
//!   │        └────────────┘          └──────────┘
//!   │              │ not found             ▲
//!   │              ▼                       │ created
//!   │        ┌────────────┐────────────────┘
//!   │        │  Creating  │
//!   │        └────────────┘
//!   │              │ image missing
//!   │              ▼
//!   │        ┌────────────┐
//!   └────────│  Pulling   │  (new pass)
//!            └────────────┘
//! ```
//!
//! Every pull starts a fresh pass from `Inspecting`, re-reading the stored
//! container id. Passes are capped by `max_passes`. Any error other than the
//! two recoverable not-found cases is returned as-is.
//!
//! At most one `apply` per scope should be in flight. Two concurrent passes
//! on one scope can both create a container and race on the stored id.

mod ensure;
mod error;
mod spec;

pub use ensure::{ContainerHandle, Ensure, EnsureRunning};
pub use error::{Result, StateError};
pub use spec::ContainerSpec;

use std::sync::Arc;

use serde::Serialize;

use crate::config::ReconcileConfig;
use crate::runtime::{NotFoundKind, PullReport, RuntimeClient};
use crate::scope::Scope;

/// Where a reconcile pass currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Inspecting,
    Creating,
    Pulling { image: String },
}

/// Outcome of a successful `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub namespace: String,
    pub container_id: String,
    /// Whether this apply created the container.
    pub created: bool,
    /// Images pulled along the way, in order.
    pub pulled: Vec<String>,
    /// Passes taken, counting the first.
    pub passes: u32,
}

/// Reconciliation engine for one scope.
pub struct State {
    scope: Scope,
    ensure: Arc<dyn Ensure>,
    max_passes: u32,
}

impl State {
    /// Engine for `scope` with the default ensure step and pass limit.
    pub fn new(scope: &Scope) -> Self {
        Self {
            scope: scope.clone(),
            ensure: Arc::new(EnsureRunning),
            max_passes: ReconcileConfig::default().max_passes,
        }
    }

    /// Engine configured from reconcile settings.
    pub fn with_config(scope: &Scope, config: &ReconcileConfig) -> Self {
        Self::new(scope).with_max_passes(config.max_passes)
    }

    /// Replace the ensure step.
    pub fn with_ensure(mut self, ensure: Arc<dyn Ensure>) -> Self {
        self.ensure = ensure;
        self
    }

    /// Cap the number of passes per `apply`. Values below 1 are raised to 1.
    pub fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// The engine connection of this state's scope.
    pub fn docker_connection(&self) -> Option<&Arc<dyn RuntimeClient>> {
        self.scope.docker_connection()
    }

    fn connection(&self) -> Result<&Arc<dyn RuntimeClient>> {
        connection_of(&self.scope)
    }

    /// Handle for the container the scope has recorded.
    ///
    /// Reads the stored id but makes no engine call.
    pub async fn get_container(&self) -> Result<ContainerHandle> {
        let runtime = self.connection()?.clone();
        let id = self.scope.container_id().await?;
        Ok(ContainerHandle::new(id, runtime))
    }

    /// Pull an image, treating an error inside the response as failure.
    pub async fn pull_image(&self, image: &str) -> Result<PullReport> {
        pull_with(self.connection()?.as_ref(), image).await
    }

    /// Run the ensure step for an existing container.
    pub async fn ensure(&self, container: &ContainerHandle) -> Result<()> {
        self.ensure.ensure(container).await
    }

    /// Converge `scope`'s container to `spec`.
    ///
    /// Storage and engine calls both go through `scope`, so the recorded id
    /// always names a container on that scope's own engine.
    ///
    /// Image validation happens only when a create is needed, so an existing
    /// container is ensured even if the spec names no image. A scope with no
    /// recorded id goes straight to create without an inspect, so an
    /// image-less spec there fails with [`StateError::MissingImage`] even
    /// when the engine is unreachable.
    pub async fn apply(&self, scope: &Scope, spec: &ContainerSpec) -> Result<Reconciliation> {
        let runtime = connection_of(scope)?.clone();
        let namespace = scope.namespace();

        let mut pass: u32 = 1;
        let mut pulled = Vec::new();
        let mut step = Step::Inspecting;

        loop {
            tracing::debug!(namespace, pass, step = ?step, "reconcile step");

            step = match step {
                Step::Inspecting => match scope.container_id().await? {
                    None => {
                        tracing::debug!("Scope '{}' has no container recorded", namespace);
                        Step::Creating
                    }
                    Some(id) => match runtime.inspect_container(&id).await {
                        Ok(info) => {
                            let handle =
                                ContainerHandle::new(Some(info.id.clone()), runtime.clone());
                            self.ensure(&handle).await?;
                            return Ok(Reconciliation {
                                namespace: namespace.to_string(),
                                container_id: info.id,
                                created: false,
                                pulled,
                                passes: pass,
                            });
                        }
                        Err(e) if e.is_not_found(NotFoundKind::Container) => {
                            tracing::info!("Container {} not found, creating", id);
                            Step::Creating
                        }
                        Err(e) => return Err(e.into()),
                    },
                },

                Step::Creating => {
                    let image = spec.create.image_ref().ok_or(StateError::MissingImage)?;

                    match runtime.create_container(&spec.create).await {
                        Ok(id) => {
                            tracing::info!("Created container {} from {}", id, image);
                            scope.set_container_id(&id).await?;

                            let handle =
                                ContainerHandle::new(Some(id.clone()), runtime.clone());
                            self.ensure(&handle).await?;
                            return Ok(Reconciliation {
                                namespace: namespace.to_string(),
                                container_id: id,
                                created: true,
                                pulled,
                                passes: pass,
                            });
                        }
                        Err(e) if e.is_not_found(NotFoundKind::Image) => {
                            tracing::info!("Image {} not present locally", image);
                            Step::Pulling {
                                image: image.to_string(),
                            }
                        }
                        Err(e) => return Err(e.into()),
                    }
                }

                Step::Pulling { image } => {
                    if pass >= self.max_passes {
                        tracing::warn!(
                            "Giving up on {} after {} passes in scope '{}'",
                            image,
                            pass,
                            namespace
                        );
                        return Err(StateError::RetryLimitExceeded {
                            image,
                            passes: pass,
                        });
                    }

                    pull_with(runtime.as_ref(), &image).await?;
                    pulled.push(image);
                    pass += 1;
                    Step::Inspecting
                }
            };
        }
    }
}

fn connection_of(scope: &Scope) -> Result<&Arc<dyn RuntimeClient>> {
    scope
        .docker_connection()
        .ok_or_else(|| StateError::NoConnection {
            namespace: scope.namespace().to_string(),
        })
}

/// Pull through `runtime`, treating an error inside the response as failure.
async fn pull_with(runtime: &dyn RuntimeClient, image: &str) -> Result<PullReport> {
    tracing::info!("Pulling image: {}", image);
    let report = runtime.pull_image(image).await?;

    if let Some(message) = report.error() {
        return Err(StateError::PullFailed {
            image: image.to_string(),
            message: message.to_string(),
        });
    }

    tracing::info!("Pulled image: {}", image);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::runtime::{ContainerInfo, CreateOptions, PullProgress, PullReport, RuntimeError};
    use crate::scope::{CONTAINER_ID_KEY, MemoryStore};
    use crate::testing::{CountingEnsure, RuntimeCall, StubRuntime};

    fn scope_with(runtime: &Arc<StubRuntime>) -> Scope {
        Scope::new(
            "dewey",
            Arc::new(MemoryStore::new()),
            Some(runtime.clone() as Arc<dyn RuntimeClient>),
        )
    }

    fn state_with(scope: &Scope, ensure: &Arc<CountingEnsure>) -> State {
        State::new(scope).with_ensure(ensure.clone() as Arc<dyn Ensure>)
    }

    fn running(id: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.to_string(),
            running: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_exposes_docker_connection() {
        let runtime = Arc::new(StubRuntime::new());
        let scope = scope_with(&runtime);
        assert!(State::new(&scope).docker_connection().is_some());
    }

    #[tokio::test]
    async fn test_apply_uses_the_given_scopes_engine() {
        let runtime_a = Arc::new(StubRuntime::new());
        let runtime_b = Arc::new(StubRuntime::new());
        runtime_b.push_create(Err(StubRuntime::image_not_found("img")));
        runtime_b.push_create(Ok("on-b".to_string()));
        let scope_a = scope_with(&runtime_a);
        let scope_b = Scope::new(
            "huey",
            Arc::new(MemoryStore::new()),
            Some(runtime_b.clone() as Arc<dyn RuntimeClient>),
        );
        let ensure = Arc::new(CountingEnsure::new());

        let outcome = state_with(&scope_a, &ensure)
            .apply(&scope_b, &ContainerSpec::for_image("img"))
            .await
            .unwrap();

        assert_eq!(outcome.container_id, "on-b");
        assert!(runtime_a.calls().is_empty());
        assert_eq!(runtime_b.create_count(), 2);
        assert_eq!(runtime_b.pull_count(), 1);
        assert_eq!(
            scope_b.container_id().await.unwrap().as_deref(),
            Some("on-b")
        );
        assert_eq!(scope_a.container_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_apply_on_connected_scope_from_unconnected_state() {
        let runtime = Arc::new(StubRuntime::new());
        let detached = Scope::new("c", Arc::new(MemoryStore::new()), None);
        let connected = scope_with(&runtime);
        let ensure = Arc::new(CountingEnsure::new());

        let outcome = state_with(&detached, &ensure)
            .apply(&connected, &ContainerSpec::for_image("img"))
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(runtime.create_count(), 1);
    }

    #[tokio::test]
    async fn test_apply_on_unconnected_scope_fails() {
        let runtime = Arc::new(StubRuntime::new());
        let connected = scope_with(&runtime);
        let detached = Scope::new("c", Arc::new(MemoryStore::new()), None);

        let err = State::new(&connected)
            .apply(&detached, &ContainerSpec::for_image("img"))
            .await
            .unwrap_err();

        assert!(matches!(err, StateError::NoConnection { ref namespace } if namespace == "c"));
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_container_makes_no_engine_call() {
        let runtime = Arc::new(StubRuntime::new());
        let scope = scope_with(&runtime);
        scope.set_container_id("1").await.unwrap();

        let handle = State::new(&scope).get_container().await.unwrap();
        assert_eq!(handle.id(), Some("1"));
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_container_requires_connection() {
        let scope = Scope::new("dewey", Arc::new(MemoryStore::new()), None);
        let err = State::new(&scope).get_container().await.unwrap_err();
        assert!(matches!(err, StateError::NoConnection { .. }));
    }

    #[tokio::test]
    async fn test_pull_image_in_band_error() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_pull(Ok(PullReport {
            image: "some-proggie:0.0.1".to_string(),
            records: vec![PullProgress::error("the error")],
        }));
        let scope = scope_with(&runtime);

        let err = State::new(&scope)
            .pull_image("some-proggie:0.0.1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("the error"));
    }

    #[tokio::test]
    async fn test_pull_image_ok_without_error_field() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_pull(Ok(PullReport {
            image: "some-proggie:0.0.1".to_string(),
            records: vec![PullProgress::status("all good")],
        }));
        let scope = scope_with(&runtime);

        let report = State::new(&scope)
            .pull_image("some-proggie:0.0.1")
            .await
            .unwrap();
        assert_eq!(report.last_status(), Some("all good"));
        assert_eq!(
            runtime.calls(),
            vec![RuntimeCall::Pull("some-proggie:0.0.1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_apply_connectivity_error_passes_through() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_inspect(Err(RuntimeError::Connectivity {
            code: "ECONNREFUSED".to_string(),
            syscall: "connect".to_string(),
            message: "connection refused".to_string(),
        }));
        let scope = scope_with(&runtime);
        scope.set_container_id("1").await.unwrap();

        let err = State::new(&scope)
            .apply(&scope, &ContainerSpec::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("ECONNREFUSED"));
        assert_eq!(err.syscall(), Some("connect"));
    }

    #[tokio::test]
    async fn test_apply_missing_image_makes_no_engine_call() {
        let runtime = Arc::new(StubRuntime::new());
        let scope = scope_with(&runtime);

        let err = State::new(&scope)
            .apply(&scope, &ContainerSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::MissingImage));
        assert!(err.to_string().contains("Missing"));
        assert!(err.to_string().contains("Image"));
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_apply_missing_image_after_inspect_404() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_inspect(Err(StubRuntime::container_not_found("1")));
        let scope = scope_with(&runtime);
        scope.set_container_id("1").await.unwrap();

        let err = State::new(&scope)
            .apply(&scope, &ContainerSpec::new(CreateOptions::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::MissingImage));
        assert_eq!(runtime.calls(), vec![RuntimeCall::Inspect("1".to_string())]);
    }

    #[tokio::test]
    async fn test_apply_existing_container_ensures_once() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_inspect(Ok(running("1")));
        let scope = scope_with(&runtime);
        scope.set_container_id("1").await.unwrap();
        let ensure = Arc::new(CountingEnsure::new());

        let outcome = state_with(&scope, &ensure)
            .apply(&scope, &ContainerSpec::default())
            .await
            .unwrap();

        assert_eq!(ensure.calls(), 1);
        assert_eq!(ensure.ids(), vec!["1".to_string()]);
        assert!(!outcome.created);
        assert_eq!(outcome.passes, 1);
        assert_eq!(runtime.calls(), vec![RuntimeCall::Inspect("1".to_string())]);
    }

    #[tokio::test]
    async fn test_apply_image_present_creates_without_pull() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_create(Ok("abc123".to_string()));
        let scope = scope_with(&runtime);
        let ensure = Arc::new(CountingEnsure::new());

        let outcome = state_with(&scope, &ensure)
            .apply(&scope, &ContainerSpec::for_image("test-image"))
            .await
            .unwrap();

        assert!(outcome.created);
        assert!(outcome.pulled.is_empty());
        assert_eq!(ensure.calls(), 1);
        assert_eq!(runtime.pull_count(), 0);
        assert_eq!(
            scope.container_id().await.unwrap().as_deref(),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn test_apply_pulls_missing_image_then_starts_new_pass() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_inspect(Err(StubRuntime::container_not_found("1")));
        runtime.push_create(Err(StubRuntime::image_not_found("test-image")));
        runtime.push_pull(Ok(PullReport::default()));
        runtime.push_inspect(Err(StubRuntime::container_not_found("1")));
        runtime.push_create(Ok("fresh".to_string()));

        let scope = scope_with(&runtime);
        scope
            .storage()
            .set_item(CONTAINER_ID_KEY, serde_json::json!(1))
            .await
            .unwrap();
        let ensure = Arc::new(CountingEnsure::new());
        let spec = ContainerSpec::for_image("test-image");

        let outcome = state_with(&scope, &ensure)
            .apply(&scope, &spec)
            .await
            .unwrap();

        assert_eq!(
            runtime.calls(),
            vec![
                RuntimeCall::Inspect("1".to_string()),
                RuntimeCall::Create(spec.create.clone()),
                RuntimeCall::Pull("test-image".to_string()),
                RuntimeCall::Inspect("1".to_string()),
                RuntimeCall::Create(spec.create.clone()),
            ]
        );
        assert_eq!(runtime.pull_count(), 1);
        assert_eq!(outcome.pulled, vec!["test-image".to_string()]);
        assert_eq!(outcome.passes, 2);
        assert_eq!(ensure.calls(), 1);
    }

    #[tokio::test]
    async fn test_apply_retry_sees_id_stored_by_earlier_pass() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_create(Err(StubRuntime::image_not_found("test-image")));
        runtime.push_pull(Ok(PullReport::default()));
        let scope = scope_with(&runtime);
        let ensure = Arc::new(CountingEnsure::new());

        let storage = scope.storage().clone();
        runtime.on_pull(move || {
            let storage = storage.clone();
            Box::pin(async move {
                storage
                    .set_item(CONTAINER_ID_KEY, serde_json::json!("created-elsewhere"))
                    .await
                    .unwrap();
            })
        });
        runtime.push_inspect(Ok(running("created-elsewhere")));

        let outcome = state_with(&scope, &ensure)
            .apply(&scope, &ContainerSpec::for_image("test-image"))
            .await
            .unwrap();

        assert_eq!(outcome.container_id, "created-elsewhere");
        assert!(!outcome.created);
        assert_eq!(ensure.calls(), 1);
    }

    #[tokio::test]
    async fn test_apply_gives_up_after_max_passes() {
        let runtime = Arc::new(StubRuntime::new());
        for _ in 0..2 {
            runtime.push_create(Err(StubRuntime::image_not_found("test-image")));
            runtime.push_pull(Ok(PullReport::default()));
        }
        runtime.push_create(Err(StubRuntime::image_not_found("test-image")));
        let scope = scope_with(&runtime);
        let ensure = Arc::new(CountingEnsure::new());

        let err = state_with(&scope, &ensure)
            .with_max_passes(3)
            .apply(&scope, &ContainerSpec::for_image("test-image"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StateError::RetryLimitExceeded { passes: 3, .. }
        ));
        assert_eq!(runtime.pull_count(), 2);
        assert_eq!(ensure.calls(), 0);
    }

    #[tokio::test]
    async fn test_apply_other_create_failure_propagates() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_create(Err(RuntimeError::Remote {
            status: Some(409),
            message: "name already in use".to_string(),
        }));
        let scope = scope_with(&runtime);

        let err = State::new(&scope)
            .apply(&scope, &ContainerSpec::for_image("test-image"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.runtime_error(),
            Some(RuntimeError::Remote {
                status: Some(409),
                ..
            })
        ));
        assert_eq!(runtime.pull_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_failed_pull_is_not_retried() {
        let runtime = Arc::new(StubRuntime::new());
        runtime.push_create(Err(StubRuntime::image_not_found("test-image")));
        runtime.push_pull(Ok(PullReport {
            image: "test-image".to_string(),
            records: vec![PullProgress::error("manifest unknown")],
        }));
        let scope = scope_with(&runtime);

        let err = State::new(&scope)
            .apply(&scope, &ContainerSpec::for_image("test-image"))
            .await
            .unwrap_err();

        assert!(matches!(err, StateError::PullFailed { .. }));
        assert_eq!(runtime.pull_count(), 1);
        assert_eq!(runtime.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_apply_default_ensure_starts_stopped_container() {
        let runtime = Arc::new(StubRuntime::new());
        let stopped = ContainerInfo {
            id: "1".to_string(),
            running: false,
            ..Default::default()
        };
        runtime.push_inspect(Ok(stopped.clone()));
        runtime.push_inspect(Ok(stopped));
        runtime.push_inspect(Ok(running("1")));
        let scope = scope_with(&runtime);
        scope.set_container_id("1").await.unwrap();

        State::new(&scope)
            .apply(&scope, &ContainerSpec::default())
            .await
            .unwrap();

        assert!(runtime.calls().contains(&RuntimeCall::Start("1".to_string())));
    }
}
