//! Shared context handed to every drop factory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::{Config, StoreBackend};
use crate::runtime::{DockerRuntime, RuntimeClient, RuntimeError};
use crate::scope::{FileStore, MemoryStore, Scope, ScopeStore, StoreError, validate_namespace};
use crate::state::State;

/// Configuration, the engine connection, and scope storage for one process.
pub struct DropContext {
    config: Config,
    runtime: Option<Arc<dyn RuntimeClient>>,
    /// One store per namespace, so every scope opened for a namespace
    /// shares the same storage (and, for files, the same write lock).
    stores: Mutex<HashMap<String, Arc<dyn ScopeStore>>>,
}

impl DropContext {
    pub fn new(config: Config, runtime: Option<Arc<dyn RuntimeClient>>) -> Self {
        Self {
            config,
            runtime,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Context connected to the local Docker daemon.
    pub async fn connect(config: Config) -> Result<Self, RuntimeError> {
        let runtime = DockerRuntime::connect(&config.docker).await?;
        Ok(Self::new(config, Some(Arc::new(runtime))))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runtime(&self) -> Option<&Arc<dyn RuntimeClient>> {
        self.runtime.as_ref()
    }

    /// Open the scope for `namespace`.
    pub fn scope(&self, namespace: &str) -> Result<Scope, StoreError> {
        validate_namespace(namespace)?;

        let mut stores = self
            .stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let storage = match stores.get(namespace) {
            Some(store) => store.clone(),
            None => {
                let store: Arc<dyn ScopeStore> = match self.config.storage.backend {
                    StoreBackend::File => {
                        Arc::new(FileStore::new(&self.config.storage.data_dir, namespace)?)
                    }
                    StoreBackend::Memory => Arc::new(MemoryStore::new()),
                };
                tracing::debug!(
                    "Opened {} storage for scope '{}'",
                    self.config.storage.backend,
                    namespace
                );
                stores.insert(namespace.to_string(), store.clone());
                store
            }
        };

        Ok(Scope::new(namespace, storage, self.runtime.clone()))
    }

    /// Reconciliation engine for `scope`, using the configured pass limit.
    pub fn state(&self, scope: &Scope) -> State {
        State::with_config(scope, &self.config.reconcile)
    }
}

impl std::fmt::Debug for DropContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropContext")
            .field("config", &self.config)
            .field("connected", &self.runtime.is_some())
            .finish()
    }
}
