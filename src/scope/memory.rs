use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::scope::{ScopeStore, StoreError};

/// Process-local scope storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScopeStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items.write().await.remove(key);
        Ok(())
    }
}
