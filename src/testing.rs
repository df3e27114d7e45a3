//! Test doubles for reconciliation and dispatch.
//!
//! Provides:
//! - [`StubRuntime`]: a scripted `RuntimeClient` that records every call
//! - [`CountingEnsure`]: an ensure step that only counts invocations
//! - [`test_context`]: a `DropContext` wired to a stub runtime and memory storage
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dropdock::testing::StubRuntime;
//!
//! # async fn example() {
//! let runtime = Arc::new(StubRuntime::new());
//! runtime.push_inspect(Err(StubRuntime::container_not_found("1")));
//! // hand `runtime` to a Scope, run State::apply, then check runtime.calls()
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::config::Config;
use crate::context::DropContext;
use crate::runtime::{
    ContainerInfo, CreateOptions, NotFoundKind, PullProgress, PullReport, RuntimeClient,
    RuntimeError,
};
use crate::state::{ContainerHandle, Ensure};

/// A call received by [`StubRuntime`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    Inspect(String),
    Create(CreateOptions),
    Pull(String),
    Start(String),
}

type PullHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// A scripted runtime.
///
/// Each operation pops its next queued response. When a queue is empty the
/// stub falls back to: inspect reports not-found, create succeeds with a
/// generated id, pull succeeds with one status line, start succeeds.
#[derive(Default)]
pub struct StubRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    inspect: Mutex<VecDeque<Result<ContainerInfo, RuntimeError>>>,
    create: Mutex<VecDeque<Result<String, RuntimeError>>>,
    pull: Mutex<VecDeque<Result<PullReport, RuntimeError>>>,
    start: Mutex<VecDeque<Result<(), RuntimeError>>>,
    pull_hook: Mutex<Option<PullHook>>,
    created: AtomicU32,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_not_found(id: &str) -> RuntimeError {
        RuntimeError::NotFound {
            kind: NotFoundKind::Container,
            message: format!("No such container: {}", id),
        }
    }

    pub fn image_not_found(image: &str) -> RuntimeError {
        RuntimeError::NotFound {
            kind: NotFoundKind::Image,
            message: format!("No such image: {}", image),
        }
    }

    pub fn connection_refused() -> RuntimeError {
        RuntimeError::Connectivity {
            code: "ECONNREFUSED".to_string(),
            syscall: "connect".to_string(),
            message: "connect ECONNREFUSED /var/run/docker.sock".to_string(),
        }
    }

    pub fn push_inspect(&self, response: Result<ContainerInfo, RuntimeError>) {
        lock(&self.inspect).push_back(response);
    }

    pub fn push_create(&self, response: Result<String, RuntimeError>) {
        lock(&self.create).push_back(response);
    }

    pub fn push_pull(&self, response: Result<PullReport, RuntimeError>) {
        lock(&self.pull).push_back(response);
    }

    pub fn push_start(&self, response: Result<(), RuntimeError>) {
        lock(&self.start).push_back(response);
    }

    /// Run `hook` inside every pull, before its response is returned.
    pub fn on_pull<F>(&self, hook: F)
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let hook: PullHook = Arc::new(hook);
        *lock(&self.pull_hook) = Some(hook);
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<RuntimeCall> {
        lock(&self.calls).clone()
    }

    pub fn pull_count(&self) -> usize {
        self.count(|c| matches!(c, RuntimeCall::Pull(_)))
    }

    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, RuntimeCall::Create(_)))
    }

    fn count(&self, pred: impl Fn(&RuntimeCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: RuntimeCall) {
        lock(&self.calls).push(call);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RuntimeClient for StubRuntime {
    async fn inspect_container(&self, id: &str) -> Result<ContainerInfo, RuntimeError> {
        self.record(RuntimeCall::Inspect(id.to_string()));
        lock(&self.inspect)
            .pop_front()
            .unwrap_or_else(|| Err(Self::container_not_found(id)))
    }

    async fn create_container(&self, options: &CreateOptions) -> Result<String, RuntimeError> {
        self.record(RuntimeCall::Create(options.clone()));
        let next = lock(&self.create).pop_front();
        next.unwrap_or_else(|| {
            let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("stub-container-{}", n))
        })
    }

    async fn pull_image(&self, image: &str) -> Result<PullReport, RuntimeError> {
        self.record(RuntimeCall::Pull(image.to_string()));
        let hook = lock(&self.pull_hook).clone();
        if let Some(hook) = hook {
            (*hook)().await;
        }
        let next = lock(&self.pull).pop_front();
        next.unwrap_or_else(|| {
            Ok(PullReport {
                image: image.to_string(),
                records: vec![PullProgress::status(format!(
                    "Downloaded newer image for {}",
                    image
                ))],
            })
        })
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Start(id.to_string()));
        lock(&self.start).pop_front().unwrap_or(Ok(()))
    }
}

/// An ensure step that records which containers it was called for.
#[derive(Debug, Default)]
pub struct CountingEnsure {
    calls: AtomicU32,
    ids: Mutex<Vec<String>>,
}

impl CountingEnsure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn ids(&self) -> Vec<String> {
        lock(&self.ids).clone()
    }
}

#[async_trait]
impl Ensure for CountingEnsure {
    async fn ensure(&self, container: &ContainerHandle) -> crate::state::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(id) = container.id() {
            lock(&self.ids).push(id.to_string());
        }
        Ok(())
    }
}

/// A drop context over `runtime` with in-memory scope storage.
pub fn test_context(runtime: Arc<StubRuntime>) -> Arc<DropContext> {
    let config = Config::for_testing(std::env::temp_dir().join("dropdock-tests"));
    Arc::new(DropContext::new(
        config,
        Some(runtime as Arc<dyn RuntimeClient>),
    ))
}
