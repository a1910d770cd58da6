//! `PostgreSQL` document store.
//!
//! Documents live in a single `documents` table keyed by `(collection, id)`
//! with a JSONB body. A trigger (see `crates/core/migrations/`) broadcasts
//! the collection name on the `document_changes` channel after each write;
//! a background listener turns those notifications into watch updates, so
//! writes from other processes reach subscribers too.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::{Document, DocumentStore, DocumentStoreError, Fields};

/// Notification channel written by the `notify_document_change` trigger.
pub const CHANGE_CHANNEL: &str = "document_changes";

type Watchers = Arc<Mutex<HashMap<String, watch::Sender<u64>>>>;

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Fields>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            data: row.data.0,
        }
    }
}

/// Document store backed by a `PostgreSQL` JSONB table.
pub struct PgDocumentStore {
    pool: PgPool,
    watchers: Watchers,
    listener: JoinHandle<()>,
}

impl std::fmt::Debug for PgDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDocumentStore").finish_non_exhaustive()
    }
}

impl PgDocumentStore {
    /// Connect and start listening for change notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener connection cannot be established.
    pub async fn connect(pool: PgPool) -> Result<Self, DocumentStoreError> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let watchers: Watchers = Arc::new(Mutex::new(HashMap::new()));
        let task_watchers = Arc::clone(&watchers);

        let listener = tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        let watchers = task_watchers.lock().await;
                        if let Some(sender) = watchers.get(notification.payload()) {
                            sender.send_modify(|version| *version = version.wrapping_add(1));
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Document change listener stopped");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            pool,
            watchers,
            listener,
        })
    }

    /// Underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Drop for PgDocumentStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT id, data
            FROM documents
            WHERE collection = $1
            ORDER BY created_at, id
            ",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn add(&self, collection: &str, data: Fields) -> Result<String, DocumentStoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        sqlx::query(
            r"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(collection)
        .bind(&id)
        .bind(Json(data))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
    ) -> Result<(), DocumentStoreError> {
        sqlx::query(
            r"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = now()
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(data))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<(), DocumentStoreError> {
        // `||` on jsonb objects is a shallow merge.
        let result = sqlx::query(
            r"
            UPDATE documents
            SET data = data || $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(patch))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DocumentStoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentStoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn watch(&self, collection: &str) -> Result<watch::Receiver<u64>, DocumentStoreError> {
        if self.listener.is_finished() {
            tracing::warn!(collection, "Watching a collection without a live change listener");
        }
        let mut watchers = self.watchers.lock().await;
        let sender = watchers
            .entry(collection.to_owned())
            .or_insert_with(|| watch::channel(0).0);
        Ok(sender.subscribe())
    }
}
