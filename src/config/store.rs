//! Configuration stores and the shared snapshot cache.

use hashbrown::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use super::MatrixConfig;
use crate::Result;

/// Source of configuration documents, addressed by logical key.
///
/// `Ok(None)` means the document does not exist; `Err` means the store
/// could not answer.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load_document(&self, key: &str) -> Result<Option<JsonValue>>;
}

/// In-process store. Used by tests and by embedders that already hold
/// their documents in memory.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    documents: RwLock<HashMap<String, JsonValue>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, key: impl Into<String>, doc: JsonValue) -> Self {
        self.insert(key, doc);
        self
    }

    pub fn insert(&self, key: impl Into<String>, doc: JsonValue) {
        self.documents.write().insert(key.into(), doc);
    }

    pub fn remove(&self, key: &str) -> Option<JsonValue> {
        self.documents.write().remove(key)
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load_document(&self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.documents.read().get(key).cloned())
    }
}

/// Reads `<root>/<key>.json`. A missing file is an absent document.
#[cfg(feature = "fs")]
#[derive(Debug, Clone)]
pub struct DirConfigStore {
    root: std::path::PathBuf,
}

#[cfg(feature = "fs")]
impl DirConfigStore {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> std::path::PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[cfg(feature = "fs")]
#[async_trait]
impl ConfigStore for DirConfigStore {
    async fn load_document(&self, key: &str) -> Result<Option<JsonValue>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let doc = serde_json::from_str(&text).map_err(|e| crate::Error::InvalidConfiguration {
                    document: key.to_string(),
                    message: format!("{}: {e}", path.display()),
                })?;
                Ok(Some(doc))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read-mostly holder for the current configuration snapshot.
///
/// Readers clone the inner `Arc` and keep using it for the whole request;
/// a reload swaps in a new snapshot without touching ones already handed out.
#[derive(Debug)]
pub struct ConfigCache {
    current: RwLock<Arc<MatrixConfig>>,
}

impl ConfigCache {
    pub fn new(config: MatrixConfig) -> Self {
        Self { current: RwLock::new(Arc::new(config)) }
    }

    /// Load from `store`; fails without a usable configuration.
    pub async fn from_store<S: ConfigStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self::new(MatrixConfig::load(store).await?))
    }

    pub fn snapshot(&self) -> Arc<MatrixConfig> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, config: MatrixConfig) {
        *self.current.write() = Arc::new(config);
    }

    /// Reload from `store`. On failure the previous snapshot stays current.
    pub async fn reload<S: ConfigStore + ?Sized>(&self, store: &S) -> Result<()> {
        let config = MatrixConfig::load(store).await?;
        self.replace(config);
        tracing::debug!("matrix configuration reloaded");
        Ok(())
    }
}
