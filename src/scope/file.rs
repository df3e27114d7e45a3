//! JSON file scope storage.
//!
//! Each namespace is one JSON object at `<data_dir>/<namespace>.json`.
//! Writes go to a sibling temp file that is then renamed over the original,
//! so a crash mid-write leaves the previous state intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::scope::{ScopeStore, StoreError, validate_namespace};

type Items = serde_json::Map<String, serde_json::Value>;

/// File-backed scope storage.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Storage for `namespace` under `data_dir`. Nothing is touched on disk
    /// until the first write.
    pub fn new(data_dir: impl AsRef<Path>, namespace: &str) -> Result<Self, StoreError> {
        validate_namespace(namespace)?;
        Ok(Self {
            path: data_dir.as_ref().join(format!("{}.json", namespace)),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Items, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Items::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(serde_json::Value::Object(items)) => Ok(items),
            Ok(_) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                message: "expected a JSON object".to_string(),
            }),
            Err(e) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    async fn save(&self, items: &Items) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let body = serde_json::to_vec_pretty(items).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl ScopeStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        items.insert(key.to_string(), value);
        self.save(&items).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        if items.remove(key).is_some() {
            self.save(&items).await?;
        }
        Ok(())
    }
}
