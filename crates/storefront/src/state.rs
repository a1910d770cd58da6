//! Application state shared across handlers.

use std::sync::Arc;

use modern_shop_core::docstore::SharedDocumentStore;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::{CheckoutService, OrderNotifier};
use crate::storage::{SharedKeyValueStore, StorageError};
use crate::stores::{CartStore, CatalogStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and owns the catalog and
/// cart stores; there are no global stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    documents: SharedDocumentStore,
    catalog: CatalogStore,
    carts: CartStore,
    checkout: CheckoutService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` pool, when a database is configured
    /// * `documents` - Document store holding orders and settings
    /// * `kv` - Local storage for the catalog snapshot and carts
    /// * `notifier` - Order notification channel, if email is configured
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog snapshot cannot be loaded or seeded.
    pub async fn new(
        config: StorefrontConfig,
        pool: Option<PgPool>,
        documents: SharedDocumentStore,
        kv: SharedKeyValueStore,
        notifier: Option<Arc<dyn OrderNotifier>>,
    ) -> Result<Self, StorageError> {
        let catalog = CatalogStore::open(Arc::clone(&kv)).await?;
        let carts = CartStore::new(kv);
        let checkout = CheckoutService::new(Arc::clone(&documents), notifier, config.tax_rate);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                documents,
                catalog,
                carts,
                checkout,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the database connection pool, if one is configured.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn documents(&self) -> &SharedDocumentStore {
        &self.inner.documents
    }

    /// Get a reference to the catalog store.
    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }
}
