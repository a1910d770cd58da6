//! Document store abstraction.
//!
//! Products, categories, orders, settings and identity records live as JSON
//! documents grouped in named collections. [`DocumentStore`] is the seam
//! between the application and the backing service:
//!
//! - [`MemoryDocumentStore`] keeps everything in process (tests, local runs)
//! - `PgDocumentStore` (feature `postgres`) stores JSONB rows and delivers
//!   change notifications through `LISTEN`/`NOTIFY`
//!
//! Writes are last-write-wins. There are no transactions across documents.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use memory::MemoryDocumentStore;
#[cfg(feature = "postgres")]
pub use postgres::PgDocumentStore;

/// Top-level fields of a document.
pub type Fields = Map<String, Value>;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// Database error from sqlx.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Update targeted a document that does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound {
        collection: String,
        id: String,
    },

    /// Value could not be turned into a JSON object.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Stored document does not match the expected shape.
    #[error("data corruption in {collection}/{id}: {source}")]
    DataCorruption {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A stored document: its id plus its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    /// Decode into a typed record.
    ///
    /// The document id is injected as an `id` field before decoding, so
    /// record types carry their id without storing it twice.
    ///
    /// # Errors
    ///
    /// Returns `DataCorruption` if the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self, collection: &str) -> Result<T, DocumentStoreError> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(|source| {
            DocumentStoreError::DataCorruption {
                collection: collection.to_owned(),
                id: self.id.clone(),
                source,
            }
        })
    }
}

/// Serialize a record into document fields, dropping its `id`.
///
/// # Errors
///
/// Returns `InvalidDocument` if `value` does not serialize to a JSON object.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> Result<Fields, DocumentStoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(mut fields)) => {
            fields.remove("id");
            Ok(fields)
        }
        Ok(other) => Err(DocumentStoreError::InvalidDocument(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(DocumentStoreError::InvalidDocument(e.to_string())),
    }
}

/// Shallow merge: top-level keys in `patch` replace those in `target`.
pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

/// Per-collection document storage with change notification.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// All documents in a collection, oldest first.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError>;

    /// One document, or `None` if absent.
    async fn get(&self, collection: &str, id: &str)
    -> Result<Option<Document>, DocumentStoreError>;

    /// Insert a document under a generated id and return that id.
    async fn add(&self, collection: &str, data: Fields) -> Result<String, DocumentStoreError>;

    /// Create or replace a document under a known id.
    async fn set(&self, collection: &str, id: &str, data: Fields)
    -> Result<(), DocumentStoreError>;

    /// Shallow-merge `patch` into an existing document.
    ///
    /// Fails with `NotFound` if the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Fields)
    -> Result<(), DocumentStoreError>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentStoreError>;

    /// Change counter for a collection. The value changes after every write
    /// to the collection, from this process or (for shared backends) any other.
    async fn watch(&self, collection: &str) -> Result<watch::Receiver<u64>, DocumentStoreError>;
}

/// Shared handle to a document store.
pub type SharedDocumentStore = Arc<dyn DocumentStore>;

/// Typed view over one collection.
pub struct Collection<T> {
    store: SharedDocumentStore,
    name: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name,
            _record: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    #[must_use]
    pub const fn new(store: SharedDocumentStore, name: &'static str) -> Self {
        Self {
            store,
            name,
            _record: PhantomData,
        }
    }

    /// Collection name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Decode every document. Undecodable documents are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn list(&self) -> Result<Vec<T>, DocumentStoreError> {
        let documents = self.store.list(self.name).await?;
        Ok(decode_all(self.name, &documents))
    }

    /// # Errors
    ///
    /// Returns `DataCorruption` if the stored document cannot be decoded.
    pub async fn get(&self, id: &str) -> Result<Option<T>, DocumentStoreError> {
        self.store
            .get(self.name, id)
            .await?
            .map(|doc| doc.decode(self.name))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns an error if encoding or the backend fails.
    pub async fn add(&self, record: &T) -> Result<String, DocumentStoreError> {
        self.store.add(self.name, to_fields(record)?).await
    }

    /// # Errors
    ///
    /// Returns an error if encoding or the backend fails.
    pub async fn set(&self, id: &str, record: &T) -> Result<(), DocumentStoreError> {
        self.store.set(self.name, id, to_fields(record)?).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the document does not exist.
    pub async fn update(&self, id: &str, patch: Fields) -> Result<(), DocumentStoreError> {
        self.store.update(self.name, id, patch).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn delete(&self, id: &str) -> Result<bool, DocumentStoreError> {
        self.store.delete(self.name, id).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend cannot deliver change notifications.
    pub async fn watch(&self) -> Result<watch::Receiver<u64>, DocumentStoreError> {
        self.store.watch(self.name).await
    }
}

/// Decode documents, skipping (and logging) the ones that do not fit `T`.
pub fn decode_all<T: DeserializeOwned>(collection: &str, documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match doc.decode(collection) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable document");
                None
            }
        })
        .collect()
}

/// Handle for a live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop receiving snapshots.
    pub fn cancel(self) {
        drop(self);
    }

    /// Whether the subscription task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Deliver the current contents of `collection` to `on_snapshot`, then a
/// fresh snapshot after every change, until the returned handle is dropped.
///
/// Snapshot reads that fail are logged and skipped; the subscription keeps
/// running. Bursts of changes may be coalesced into one snapshot.
///
/// # Errors
///
/// Returns an error if change notifications cannot be set up.
pub async fn subscribe<F>(
    store: SharedDocumentStore,
    collection: &str,
    mut on_snapshot: F,
) -> Result<Subscription, DocumentStoreError>
where
    F: FnMut(Vec<Document>) + Send + 'static,
{
    let mut changes = store.watch(collection).await?;
    let collection = collection.to_owned();

    let task = tokio::spawn(async move {
        loop {
            match store.list(&collection).await {
                Ok(documents) => on_snapshot(documents),
                Err(e) => {
                    tracing::warn!(collection = %collection, error = %e, "Snapshot read failed");
                }
            }
            if changes.changed().await.is_err() {
                tracing::debug!(collection = %collection, "Change feed closed");
                break;
            }
        }
    });

    Ok(Subscription { task })
}
