//! End-to-end reconciliation through the public API.
//!
//! Drives `State::apply` and the `container` drop against a scripted runtime,
//! checking the exact sequence of engine calls and what ends up in scope
//! storage.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use dropdock::{
    Config, ContainerSpec, DropContext, DropRegistry, Performer, State,
    runtime::{ContainerInfo, CreateOptions, PullReport, RuntimeClient},
    scope::{CONTAINER_ID_KEY, MemoryStore, Scope, ScopeStore},
    state::StateError,
    testing::{CountingEnsure, RuntimeCall, StubRuntime, test_context},
};

// ── Missing container and missing image recover with one pull ──────────────

#[tokio::test]
async fn missing_container_and_image_pull_then_retry_same_scope() {
    let runtime = Arc::new(StubRuntime::new());
    runtime.push_inspect(Err(StubRuntime::container_not_found("1")));
    runtime.push_create(Err(StubRuntime::image_not_found("test-image")));
    runtime.push_pull(Ok(PullReport::default()));

    let scope = Scope::new(
        "dewey",
        Arc::new(MemoryStore::new()),
        Some(runtime.clone() as Arc<dyn RuntimeClient>),
    );
    assert_ok!(scope.storage().set_item(CONTAINER_ID_KEY, json!(1)).await);

    let ensure = Arc::new(CountingEnsure::new());
    let state = State::new(&scope).with_ensure(ensure.clone());
    let spec = ContainerSpec::for_image("test-image");

    let outcome = assert_ok!(state.apply(&scope, &spec).await);

    // Second pass: same stored id inspected again, same options created again
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
    assert_eq!(outcome.namespace, "dewey");
    assert_eq!(outcome.passes, 2);
    assert_eq!(outcome.pulled, vec!["test-image".to_string()]);

    // The id from the successful create replaced the stale one
    let stored = assert_ok!(scope.container_id().await);
    assert_eq!(stored.as_deref(), Some(outcome.container_id.as_str()));
    assert_eq!(ensure.ids(), vec![outcome.container_id.clone()]);
}

// ── Validation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn spec_without_image_fails_before_any_engine_call() {
    let runtime = Arc::new(StubRuntime::new());
    let scope = Scope::new(
        "dewey",
        Arc::new(MemoryStore::new()),
        Some(runtime.clone() as Arc<dyn RuntimeClient>),
    );

    let spec = ContainerSpec::new(CreateOptions {
        name: Some("web".to_string()),
        ..Default::default()
    });
    let err = assert_err!(State::new(&scope).apply(&scope, &spec).await);

    assert!(matches!(err, StateError::MissingImage));
    assert!(runtime.calls().is_empty());
}

// ── Through the performer ──────────────────────────────────────────────────

#[tokio::test]
async fn container_drop_up_then_status_then_forget() {
    let dir = tempfile::tempdir().unwrap();
    let spec_path = dir.path().join("web.json");
    std::fs::write(
        &spec_path,
        r#"{ "create": { "name": "web", "Image": "nginx:1.27" } }"#,
    )
    .unwrap();

    let runtime = Arc::new(StubRuntime::new());
    runtime.push_create(Ok("web-1".to_string()));
    // One inspect for the ensure step after create, one for `status`
    for _ in 0..2 {
        runtime.push_inspect(Ok(ContainerInfo {
            id: "web-1".to_string(),
            running: true,
            ..Default::default()
        }));
    }
    let context = test_context(runtime.clone());
    let registry = DropRegistry::builtin();
    let argv = vec![
        spec_path.to_string_lossy().into_owned(),
        "--namespace".to_string(),
        "dewey".to_string(),
    ];
    let performer = Performer::new("container", argv, &registry, context.clone());

    for action in ["up", "status", "forget"] {
        assert!(performer.can_perform(action).await.ok, "{action}");
    }
    assert!(!performer.can_perform("destroy").await.ok);

    let up = assert_ok!(performer.perform("up").await);
    assert_eq!(up.result["created"], json!(true));
    assert_eq!(up.result["container_id"], json!("web-1"));

    let status = assert_ok!(performer.perform("status").await);
    assert_eq!(status.result["id"], json!("web-1"));
    assert_eq!(status.result["container"]["running"], json!(true));

    let forget = assert_ok!(performer.perform("forget").await);
    assert_eq!(forget.result["forgotten"], json!("web-1"));
    assert_eq!(runtime.create_count(), 1);

    let scope = assert_ok!(context.scope("dewey"));
    assert_eq!(assert_ok!(scope.container_id().await), None);
}

#[tokio::test]
async fn file_store_keeps_container_id_across_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::for_testing(dir.path());
    config.storage.backend = dropdock::config::StoreBackend::File;

    let runtime = Arc::new(StubRuntime::new());
    runtime.push_create(Ok("persisted".to_string()));

    let first = DropContext::new(
        config.clone(),
        Some(runtime.clone() as Arc<dyn RuntimeClient>),
    );
    let scope = assert_ok!(first.scope("dewey"));
    let ensure = Arc::new(CountingEnsure::new());
    assert_ok!(
        first
            .state(&scope)
            .with_ensure(ensure.clone())
            .apply(&scope, &ContainerSpec::for_image("nginx"))
            .await
    );

    let restarted = DropContext::new(config, Some(runtime as Arc<dyn RuntimeClient>));
    let scope = assert_ok!(restarted.scope("dewey"));
    assert_eq!(
        assert_ok!(scope.container_id().await).as_deref(),
        Some("persisted")
    );
    assert!(dir.path().join("dewey.json").exists());
}
