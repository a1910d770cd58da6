//! Catalog administration over the shared document store.
//!
//! Each mutation loads the current catalog, applies the rule from
//! `modern_shop_core::catalog`, then writes only the affected document.
//! Writes from this process are serialized; concurrent writers elsewhere
//! are last-write-wins.

use chrono::Utc;
use modern_shop_core::ProductId;
use modern_shop_core::catalog::{
    CATEGORIES_COLLECTION, Catalog, CatalogError, Category, CategoryRecord, NewProduct,
    PRODUCTS_COLLECTION, Product, ProductPatch, ProductQuery, decremented_stock, load_catalog,
};
use modern_shop_core::docstore::{SharedDocumentStore, to_fields};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::instrument;

use super::ServiceError;

/// Product and category management.
pub struct CatalogService {
    documents: SharedDocumentStore,
    write_lock: Mutex<()>,
}

impl CatalogService {
    #[must_use]
    pub fn new(documents: SharedDocumentStore) -> Self {
        Self {
            documents,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Catalog, ServiceError> {
        Ok(load_catalog(self.documents.as_ref()).await?)
    }

    /// Products matching `query`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store fails.
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ServiceError> {
        let catalog = self.load().await?;
        Ok(catalog.search(query).into_iter().cloned().collect())
    }

    /// # Errors
    ///
    /// Returns `ProductNotFound` for an unknown id.
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ServiceError> {
        let document = self
            .documents
            .get(PRODUCTS_COLLECTION, id.as_str())
            .await?
            .ok_or_else(|| CatalogError::ProductNotFound(id.clone()))?;
        Ok(document.decode(PRODUCTS_COLLECTION)?)
    }

    /// # Errors
    ///
    /// Returns a validation error or `UnknownCategory` for bad input.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_product(&self, new: NewProduct) -> Result<Product, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut catalog = self.load().await?;
        let product = catalog.add_product(new)?;
        self.documents
            .set(PRODUCTS_COLLECTION, product.id.as_str(), to_fields(&product)?)
            .await?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ProductNotFound` for an unknown id, or a validation error.
    #[instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut catalog = self.load().await?;
        let product = catalog.update_product(id, patch)?;
        self.documents
            .set(PRODUCTS_COLLECTION, id.as_str(), to_fields(&product)?)
            .await?;
        Ok(product)
    }

    /// Delete a product. Orders keep their own copies of its details.
    ///
    /// A product that is already gone counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().await;
        if self.documents.delete(PRODUCTS_COLLECTION, id.as_str()).await? {
            tracing::info!(product_id = %id, "Product deleted");
        } else {
            tracing::debug!(product_id = %id, "Product already gone");
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the document store fails.
    pub async fn categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.load().await?.categories().to_vec())
    }

    /// # Errors
    ///
    /// Returns `DuplicateCategory` if the label exists.
    #[instrument(skip(self))]
    pub async fn add_category(&self, name: &str) -> Result<Category, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut catalog = self.load().await?;
        let category = catalog.add_category(name)?;
        let record = CategoryRecord::new(category.clone());
        self.documents
            .set(CATEGORIES_COLLECTION, &record.id, to_fields(&record)?)
            .await?;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `CategoryInUse` while any product references the category.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, name: &str) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut catalog = self.load().await?;
        catalog.delete_category(name)?;
        self.documents
            .delete(CATEGORIES_COLLECTION, name.trim())
            .await?;
        Ok(())
    }

    /// Remove `amount` units of stock, clamping at zero.
    ///
    /// Returns the new stock level.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn decrement_stock(&self, id: &ProductId, amount: u32) -> Result<u32, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let product = self.get_product(id).await?;
        let stock = decremented_stock(product.stock, amount);
        let patch = json!({ "stock": stock, "updated_at": Utc::now() });
        self.documents
            .update(PRODUCTS_COLLECTION, id.as_str(), to_fields(&patch)?)
            .await?;
        tracing::debug!(product_id = %id, stock, "Stock decremented");
        Ok(stock)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use modern_shop_core::Price;
    use modern_shop_core::docstore::MemoryDocumentStore;

    use super::*;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryDocumentStore::new()))
    }

    fn new_product(name: &str, category: &str, stock: u32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            price: Price::from_cents(1500),
            category: category.to_string(),
            stock,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let service = service();
        service.add_category("Clothing").await.unwrap();

        let product = service
            .create_product(new_product("Hoodie", "Clothing", 4))
            .await
            .unwrap();
        assert_eq!(service.get_product(&product.id).await.unwrap(), product);

        let patch = ProductPatch {
            stock: Some(9),
            ..ProductPatch::default()
        };
        let updated = service.update_product(&product.id, &patch).await.unwrap();
        assert_eq!(updated.stock, 9);

        service.delete_product(&product.id).await.unwrap();
        assert!(matches!(
            service.get_product(&product.id).await,
            Err(ServiceError::Catalog(CatalogError::ProductNotFound(_)))
        ));
        // Deleting again is a no-op.
        service.delete_product(&product.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let service = service();
        assert!(matches!(
            service.create_product(new_product("Hoodie", "Nope", 1)).await,
            Err(ServiceError::Catalog(CatalogError::UnknownCategory(_)))
        ));
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let service = service();
        service.add_category("Clothing").await.unwrap();
        service.add_category("Empty").await.unwrap();
        service
            .create_product(new_product("Hoodie", "Clothing", 1))
            .await
            .unwrap();

        assert!(matches!(
            service.delete_category("Clothing").await,
            Err(ServiceError::Catalog(CatalogError::CategoryInUse { products: 1, .. }))
        ));
        service.delete_category("Empty").await.unwrap();

        let categories = service.categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].as_str(), "Clothing");
    }

    #[tokio::test]
    async fn test_duplicate_category() {
        let service = service();
        service.add_category("Books").await.unwrap();
        assert!(matches!(
            service.add_category("Books").await,
            Err(ServiceError::Catalog(CatalogError::DuplicateCategory(_)))
        ));
    }

    #[tokio::test]
    async fn test_decrement_stock_clamps_at_zero() {
        let service = service();
        service.add_category("Books").await.unwrap();
        let product = service
            .create_product(new_product("Atlas", "Books", 3))
            .await
            .unwrap();

        assert_eq!(service.decrement_stock(&product.id, 2).await.unwrap(), 1);
        assert_eq!(service.decrement_stock(&product.id, 5).await.unwrap(), 0);
        assert_eq!(service.get_product(&product.id).await.unwrap().stock, 0);
    }
}
