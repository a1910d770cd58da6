//! Local durable key-value storage.
//!
//! The catalog snapshot and carts are persisted as JSON envelopes
//! `{ "state": ..., "version": N }` under namespaced keys such as
//! `product-storage` or `cart-storage/<cart-id>`.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the local key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State could not be serialized.
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),

    /// Key contains characters that cannot be mapped to a file name.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// String key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a key-value store.
pub type SharedKeyValueStore = Arc<dyn KeyValueStore>;

/// Key-value store writing one JSON file per key under a directory.
///
/// `/` in a key maps to a subdirectory. Writes go to a temporary file that
/// is renamed into place, so a crash never leaves a half-written value.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            let valid = !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(StorageError::InvalidKey(key.to_owned()));
            }
            path.push(segment);
        }
        path.set_extension("json");
        Ok(path)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Volatile key-value store for tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    state: &'a T,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// A typed value persisted under one key with a schema version.
pub struct Persisted<T> {
    store: SharedKeyValueStore,
    key: String,
    version: u32,
    _state: PhantomData<fn() -> T>,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned,
{
    #[must_use]
    pub fn new(store: SharedKeyValueStore, key: impl Into<String>, version: u32) -> Self {
        Self {
            store,
            key: key.into(),
            version,
            _state: PhantomData,
        }
    }

    /// Load the stored state.
    ///
    /// A version mismatch is logged and the state is used anyway. State that
    /// does not decode is discarded with a warning and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying store fails.
    pub async fn load(&self) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) => {
                if envelope.version != self.version {
                    tracing::debug!(
                        key = %self.key,
                        stored = envelope.version,
                        expected = self.version,
                        "Stored state version differs, loading as-is"
                    );
                }
                Ok(Some(envelope.state))
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding undecodable stored state");
                Ok(None)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub async fn save(&self, state: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&EnvelopeRef {
            state,
            version: self.version,
        })?;
        self.store.put(&self.key, &raw).await
    }

    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        assert!(store.get("cart-storage/abc").await.unwrap().is_none());
        store.put("cart-storage/abc", "{}").await.unwrap();
        assert_eq!(store.get("cart-storage/abc").await.unwrap().unwrap(), "{}");
        assert!(dir.path().join("cart-storage").join("abc.json").exists());

        store.remove("cart-storage/abc").await.unwrap();
        store.remove("cart-storage/abc").await.unwrap();
        assert!(store.get("cart-storage/abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        for key in ["../etc/passwd", "a//b", "", "a/.."] {
            assert!(
                matches!(store.put(key, "x").await, Err(StorageError::InvalidKey(_))),
                "{key} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_persisted_version_mismatch_still_loads() {
        let kv: SharedKeyValueStore = Arc::new(MemoryKeyValueStore::new());
        Persisted::<Vec<u32>>::new(Arc::clone(&kv), "numbers", 1)
            .save(&vec![1, 2])
            .await
            .unwrap();

        let newer = Persisted::<Vec<u32>>::new(kv, "numbers", 2);
        assert_eq!(newer.load().await.unwrap(), Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_persisted_discards_garbage() {
        let kv: SharedKeyValueStore = Arc::new(MemoryKeyValueStore::new());
        kv.put("numbers", "not json").await.unwrap();
        let persisted = Persisted::<Vec<u32>>::new(Arc::clone(&kv), "numbers", 1);
        assert_eq!(persisted.load().await.unwrap(), None);

        kv.put("numbers", r#"{"state": "wrong shape", "version": 1}"#)
            .await
            .unwrap();
        assert_eq!(persisted.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persisted_envelope_shape() {
        let kv: SharedKeyValueStore = Arc::new(MemoryKeyValueStore::new());
        Persisted::<Vec<u32>>::new(Arc::clone(&kv), "numbers", 3)
            .save(&vec![7])
            .await
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&kv.get("numbers").await.unwrap().unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"state": [7], "version": 3}));
    }
}
