//! Application state shared across handlers.

use std::sync::Arc;

use modern_shop_core::docstore::SharedDocumentStore;
use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::{
    CatalogService, IdentityProvider, ImageHost, OrderService, RoleDirectory, SettingsService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: Option<PgPool>,
    identity: Arc<dyn IdentityProvider>,
    roles: RoleDirectory,
    catalog: CatalogService,
    orders: OrderService,
    settings: SettingsService,
    image_host: Option<Arc<dyn ImageHost>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Admin configuration
    /// * `pool` - `PostgreSQL` pool, when a database is configured
    /// * `documents` - Document store shared with the storefront
    /// * `identity` - Credential check used by the login form
    /// * `image_host` - Upload target, if one is configured
    #[must_use]
    pub fn new(
        config: AdminConfig,
        pool: Option<PgPool>,
        documents: &SharedDocumentStore,
        identity: Arc<dyn IdentityProvider>,
        image_host: Option<Arc<dyn ImageHost>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                identity,
                roles: RoleDirectory::new(Arc::clone(documents)),
                catalog: CatalogService::new(Arc::clone(documents)),
                orders: OrderService::new(Arc::clone(documents)),
                settings: SettingsService::new(Arc::clone(documents)),
                image_host,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get the database connection pool, if one is configured.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    #[must_use]
    pub fn roles(&self) -> &RoleDirectory {
        &self.inner.roles
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsService {
        &self.inner.settings
    }

    /// Get the image host, if uploads are configured.
    #[must_use]
    pub fn image_host(&self) -> Option<&dyn ImageHost> {
        self.inner.image_host.as_deref()
    }
}
