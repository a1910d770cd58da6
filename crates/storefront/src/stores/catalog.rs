//! Local catalog snapshot.

use modern_shop_core::ProductId;
use modern_shop_core::catalog::{
    Catalog, CatalogError, Category, NewProduct, Product, ProductPatch, load_catalog,
};
use modern_shop_core::docstore::{DocumentStore, DocumentStoreError};
use modern_shop_core::types::Price;
use tokio::sync::RwLock;

use super::StoreError;
use crate::storage::{Persisted, SharedKeyValueStore, StorageError};

/// Storage key of the catalog snapshot.
pub const CATALOG_KEY: &str = "product-storage";

const CATALOG_VERSION: u32 = 1;

/// The storefront's own copy of the catalog.
///
/// Seeded with [`sample_catalog`] on first run. It is independent of the
/// admin's document collections except for one explicit
/// [`refresh_from`](Self::refresh_from) at startup.
pub struct CatalogStore {
    catalog: RwLock<Catalog>,
    persisted: Persisted<Catalog>,
}

impl CatalogStore {
    /// Load the persisted snapshot, seeding the sample catalog if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn open(kv: SharedKeyValueStore) -> Result<Self, StorageError> {
        let persisted = Persisted::new(kv, CATALOG_KEY, CATALOG_VERSION);
        let catalog = match persisted.load().await? {
            Some(catalog) => catalog,
            None => {
                let catalog = sample_catalog();
                persisted.save(&catalog).await?;
                tracing::info!(
                    products = catalog.list_products().len(),
                    "Seeded sample catalog"
                );
                catalog
            }
        };

        Ok(Self {
            catalog: RwLock::new(catalog),
            persisted,
        })
    }

    /// Run `f` against the current catalog.
    pub async fn read<R>(&self, f: impl FnOnce(&Catalog) -> R) -> R {
        f(&*self.catalog.read().await)
    }

    /// Clone of the current catalog.
    pub async fn snapshot(&self) -> Catalog {
        self.catalog.read().await.clone()
    }

    pub async fn get(&self, id: &ProductId) -> Option<Product> {
        self.read(|c| c.get(id).cloned()).await
    }

    /// Replace the whole snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    pub async fn replace(&self, catalog: Catalog) -> Result<(), StorageError> {
        let mut current = self.catalog.write().await;
        self.persisted.save(&catalog).await?;
        *current = catalog;
        Ok(())
    }

    /// Pull products and categories from the document store.
    ///
    /// An empty `products` collection leaves the local snapshot untouched.
    /// Returns whether the snapshot was replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store cannot be read.
    pub async fn refresh_from(&self, documents: &dyn DocumentStore) -> Result<bool, RefreshError> {
        let remote = load_catalog(documents).await?;
        if remote.list_products().is_empty() {
            tracing::debug!("Document store has no products, keeping local catalog");
            return Ok(false);
        }
        tracing::info!(
            products = remote.list_products().len(),
            categories = remote.categories().len(),
            "Refreshed catalog from document store"
        );
        self.replace(remote).await?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns a catalog validation error or a storage error.
    pub async fn add_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        self.mutate(|c| c.add_product(new)).await
    }

    /// # Errors
    ///
    /// Returns `ProductNotFound`, a validation error or a storage error.
    pub async fn update_product(
        &self,
        id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, StoreError> {
        self.mutate(|c| c.update_product(id, patch)).await
    }

    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    pub async fn delete_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        self.mutate(|c| Ok(c.delete_product(id))).await
    }

    /// # Errors
    ///
    /// Returns `DuplicateCategory` or a storage error.
    pub async fn add_category(&self, name: &str) -> Result<Category, StoreError> {
        self.mutate(|c| c.add_category(name)).await
    }

    /// # Errors
    ///
    /// Returns `CategoryInUse` or a storage error.
    pub async fn delete_category(&self, name: &str) -> Result<(), StoreError> {
        self.mutate(|c| c.delete_category(name)).await
    }

    /// # Errors
    ///
    /// Returns `ProductNotFound` or a storage error.
    pub async fn decrement_stock(&self, id: &ProductId, amount: u32) -> Result<u32, StoreError> {
        self.mutate(|c| c.decrement_stock(id, amount)).await
    }

    /// Apply `f` to a copy, persist it, then publish it.
    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Catalog) -> Result<R, CatalogError>,
    ) -> Result<R, StoreError> {
        let mut current = self.catalog.write().await;
        let mut next = current.clone();
        let result = f(&mut next)?;
        self.persisted.save(&next).await?;
        *current = next;
        Ok(result)
    }
}

/// Errors from [`CatalogStore::refresh_from`].
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Documents(#[from] DocumentStoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Catalog shown to first-time visitors before any admin data exists.
#[must_use]
pub fn sample_catalog() -> Catalog {
    let categories = ["Electronics", "Clothing", "Accessories"]
        .into_iter()
        .filter_map(|name| Category::parse(name).ok())
        .collect();
    let mut catalog = Catalog::from_parts(Vec::new(), categories);

    let samples = [
        (
            "Smartphone XYZ",
            "6.5\" display, 128GB storage and a triple camera.",
            69_999,
            "Electronics",
            10,
        ),
        (
            "Laptop Pro",
            "14\" laptop with 16GB RAM and 512GB SSD.",
            129_999,
            "Electronics",
            5,
        ),
        (
            "Premium T-Shirt",
            "100% organic cotton, relaxed fit.",
            2_999,
            "Clothing",
            20,
        ),
        (
            "Elegant Watch",
            "Stainless steel case with a leather strap.",
            19_999,
            "Accessories",
            8,
        ),
    ];

    for (name, description, cents, category, stock) in samples {
        let added = catalog.add_product(NewProduct {
            name: name.to_string(),
            description: description.to_string(),
            price: Price::from_cents(cents),
            category: category.to_string(),
            stock,
            image_url: None,
        });
        if let Err(e) = added {
            tracing::warn!(product = name, error = %e, "Skipping sample product");
        }
    }

    catalog
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use modern_shop_core::catalog::{CATEGORIES_COLLECTION, CategoryRecord, PRODUCTS_COLLECTION};
    use modern_shop_core::docstore::{MemoryDocumentStore, to_fields};

    use super::*;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore};

    async fn store() -> (CatalogStore, SharedKeyValueStore) {
        let kv: SharedKeyValueStore = Arc::new(MemoryKeyValueStore::new());
        (CatalogStore::open(Arc::clone(&kv)).await.unwrap(), kv)
    }

    #[test]
    fn test_sample_catalog() {
        let catalog = sample_catalog();
        assert_eq!(catalog.list_products().len(), 4);
        assert_eq!(catalog.categories().len(), 3);
        let laptop = catalog
            .list_products()
            .iter()
            .find(|p| p.name == "Laptop Pro")
            .unwrap();
        assert_eq!(laptop.price.to_string(), "$1299.99");
        assert_eq!(laptop.stock, 5);
    }

    #[tokio::test]
    async fn test_first_open_seeds_and_persists() {
        let (catalog, kv) = store().await;
        assert_eq!(catalog.read(|c| c.list_products().len()).await, 4);
        assert!(kv.get(CATALOG_KEY).await.unwrap().is_some());

        // Reopening keeps the same ids.
        let first_ids: Vec<_> = catalog
            .read(|c| c.list_products().iter().map(|p| p.id.clone()).collect())
            .await;
        let reopened = CatalogStore::open(kv).await.unwrap();
        let ids: Vec<_> = reopened
            .read(|c| c.list_products().iter().map(|p| p.id.clone()).collect())
            .await;
        assert_eq!(ids, first_ids);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_state() {
        let (catalog, _kv) = store().await;
        let err = catalog.delete_category("Electronics").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Catalog(CatalogError::CategoryInUse { products: 2, .. })
        ));
        assert_eq!(catalog.read(|c| c.categories().len()).await, 3);
    }

    #[tokio::test]
    async fn test_mutations_persist() {
        let (catalog, kv) = store().await;
        catalog.add_category("Books").await.unwrap();
        let reopened = CatalogStore::open(kv).await.unwrap();
        assert_eq!(reopened.read(|c| c.categories().len()).await, 4);
    }

    #[tokio::test]
    async fn test_refresh_from_documents() {
        let (catalog, _kv) = store().await;
        let documents = MemoryDocumentStore::new();

        assert!(!catalog.refresh_from(&documents).await.unwrap());
        assert_eq!(catalog.read(|c| c.list_products().len()).await, 4);

        let books = Category::parse("Books").unwrap();
        let record = CategoryRecord::new(books.clone());
        documents
            .set(CATEGORIES_COLLECTION, &record.id, to_fields(&record).unwrap())
            .await
            .unwrap();
        let mut remote = Catalog::from_parts(Vec::new(), vec![books]);
        let novel = remote
            .add_product(NewProduct {
                name: "Novel".to_string(),
                description: String::new(),
                price: Price::from_cents(1500),
                category: "Books".to_string(),
                stock: 3,
                image_url: None,
            })
            .unwrap();
        documents
            .set(PRODUCTS_COLLECTION, novel.id.as_str(), to_fields(&novel).unwrap())
            .await
            .unwrap();

        assert!(catalog.refresh_from(&documents).await.unwrap());
        assert_eq!(catalog.get(&novel.id).await.unwrap().name, "Novel");
        assert_eq!(catalog.read(|c| c.list_products().len()).await, 1);
    }
}
