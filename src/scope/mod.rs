//! Scopes: a namespace, its persistent storage, and its engine connection.
//!
//! The stored container id (key [`CONTAINER_ID_KEY`]) is the only record of
//! which container a scope owns. It survives restarts when the scope is
//! backed by a [`FileStore`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::runtime::RuntimeClient;

/// Storage key holding the id of the container a scope owns.
pub const CONTAINER_ID_KEY: &str = "_id";

/// Errors from scope storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt storage at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Invalid namespace '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidNamespace(String),
}

/// Per-namespace key/value storage.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn set_item(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// Render a stored id as a string.
///
/// Ids are usually strings, but numbers are accepted so hand-edited or
/// legacy state (`"_id": 1`) still resolves.
fn id_from_value(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Check that a namespace is usable as a file name.
pub fn validate_namespace(namespace: &str) -> Result<(), StoreError> {
    let valid = !namespace.is_empty()
        && namespace != "."
        && namespace != ".."
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidNamespace(namespace.to_string()))
    }
}

/// A logical deployment unit.
#[derive(Clone)]
pub struct Scope {
    namespace: String,
    storage: Arc<dyn ScopeStore>,
    connection: Option<Arc<dyn RuntimeClient>>,
}

impl Scope {
    pub fn new(
        namespace: impl Into<String>,
        storage: Arc<dyn ScopeStore>,
        connection: Option<Arc<dyn RuntimeClient>>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            storage,
            connection,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn storage(&self) -> &Arc<dyn ScopeStore> {
        &self.storage
    }

    /// The engine connection, if this scope has one.
    pub fn docker_connection(&self) -> Option<&Arc<dyn RuntimeClient>> {
        self.connection.as_ref()
    }

    /// The id of the container this scope owns, if one was recorded.
    pub async fn container_id(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .storage
            .get_item(CONTAINER_ID_KEY)
            .await?
            .and_then(id_from_value))
    }

    /// Record the id of the container this scope owns.
    pub async fn set_container_id(&self, id: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(CONTAINER_ID_KEY, serde_json::Value::String(id.to_string()))
            .await
    }

    /// Forget the owned container. The container itself is left alone.
    pub async fn clear_container_id(&self) -> Result<(), StoreError> {
        self.storage.remove_item(CONTAINER_ID_KEY).await
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("namespace", &self.namespace)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}
