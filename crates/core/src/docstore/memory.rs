//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, watch};

use super::{Document, DocumentStore, DocumentStoreError, Fields, merge_fields};

/// Document store kept entirely in memory.
///
/// Documents within a collection keep insertion order. Change notifications
/// only cover writes made through this instance.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    watchers: Mutex<HashMap<String, watch::Sender<u64>>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn notify(&self, collection: &str) {
        let watchers = self.watchers.lock().await;
        if let Some(sender) = watchers.get(collection) {
            sender.send_modify(|version| *version = version.wrapping_add(1));
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn add(&self, collection: &str, data: Fields) -> Result<String, DocumentStoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .push(Document {
                id: id.clone(),
                data,
            });
        self.notify(collection).await;
        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
    ) -> Result<(), DocumentStoreError> {
        {
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_owned()).or_default();
            match docs.iter_mut().find(|d| d.id == id) {
                Some(existing) => existing.data = data,
                None => docs.push(Document {
                    id: id.to_owned(),
                    data,
                }),
            }
        }
        self.notify(collection).await;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<(), DocumentStoreError> {
        {
            let mut collections = self.collections.write().await;
            let existing = collections
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| DocumentStoreError::NotFound {
                    collection: collection.to_owned(),
                    id: id.to_owned(),
                })?;
            merge_fields(&mut existing.data, patch);
        }
        self.notify(collection).await;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentStoreError> {
        let removed = {
            let mut collections = self.collections.write().await;
            collections.get_mut(collection).is_some_and(|docs| {
                let before = docs.len();
                docs.retain(|d| d.id != id);
                docs.len() != before
            })
        };
        if removed {
            self.notify(collection).await;
        }
        Ok(removed)
    }

    async fn watch(&self, collection: &str) -> Result<watch::Receiver<u64>, DocumentStoreError> {
        let mut watchers = self.watchers.lock().await;
        let sender = watchers
            .entry(collection.to_owned())
            .or_insert_with(|| watch::channel(0).0);
        Ok(sender.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let store = MemoryDocumentStore::new();
        let id = store
            .add("products", fields(json!({"name": "Lamp", "stock": 3})))
            .await
            .unwrap();
        store
            .set("products", "fixed", fields(json!({"name": "Desk"})))
            .await
            .unwrap();

        let all = store.list("products").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, id);
        assert_eq!(all[1].id, "fixed");

        store
            .update("products", &id, fields(json!({"stock": 1})))
            .await
            .unwrap();
        let lamp = store.get("products", &id).await.unwrap().unwrap();
        assert_eq!(lamp.data["name"], "Lamp");
        assert_eq!(lamp.data["stock"], 1);

        assert!(store.delete("products", &id).await.unwrap());
        assert!(!store.delete("products", &id).await.unwrap());
        assert!(store.get("products", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("orders", "nope", fields(json!({"status": "shipped"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_watch_counts_writes_per_collection() {
        let store = MemoryDocumentStore::new();
        let mut orders = store.watch("orders").await.unwrap();
        let products = store.watch("products").await.unwrap();

        store.add("orders", Fields::new()).await.unwrap();
        assert!(orders.has_changed().unwrap());
        assert_eq!(*orders.borrow_and_update(), 1);
        assert!(!products.has_changed().unwrap());
    }
}
