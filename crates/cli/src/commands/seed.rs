//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories: [Clothing, Electronics]
//! products:
//!   - name: Premium T-Shirt
//!     description: Soft cotton tee
//!     price: "29.99"
//!     category: Clothing
//!     stock: 50
//! ```
//!
//! Existing categories and products with the same name are left alone, so
//! the command can be re-run.

use std::collections::HashSet;
use std::path::Path;

use modern_shop_admin::services::{CatalogService, ServiceError};
use modern_shop_core::catalog::{CatalogError, NewProduct, ProductQuery};
use serde::Deserialize;
use thiserror::Error;

use super::ConnectError;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

/// What a seed run changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_added: usize,
    pub products_added: usize,
    pub skipped: usize,
}

/// Load `file` into the catalog.
pub async fn catalog(file: &Path) -> Result<(), SeedError> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| SeedError::Read {
            path: file.display().to_string(),
            source,
        })?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;
    tracing::info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        "Parsed seed file"
    );

    let documents = super::connect_documents().await?;
    let report = apply(&CatalogService::new(documents), seed).await?;
    tracing::info!(
        categories_added = report.categories_added,
        products_added = report.products_added,
        skipped = report.skipped,
        "Catalog seeded"
    );
    Ok(())
}

/// Add the seed's categories, then its products.
pub async fn apply(service: &CatalogService, seed: CatalogSeed) -> Result<SeedReport, ServiceError> {
    let mut report = SeedReport::default();

    for name in &seed.categories {
        match service.add_category(name).await {
            Ok(_) => report.categories_added += 1,
            Err(ServiceError::Catalog(CatalogError::DuplicateCategory(_))) => report.skipped += 1,
            Err(e) => return Err(e),
        }
    }

    let mut existing: HashSet<String> = service
        .list_products(&ProductQuery::default())
        .await?
        .into_iter()
        .map(|p| p.name.to_lowercase())
        .collect();

    for product in seed.products {
        if !existing.insert(product.name.trim().to_lowercase()) {
            tracing::debug!(name = %product.name, "Product exists, skipping");
            report.skipped += 1;
            continue;
        }
        service.create_product(product).await?;
        report.products_added += 1;
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use modern_shop_core::docstore::MemoryDocumentStore;

    use super::*;

    const SEED: &str = r#"
categories: [Clothing, Electronics]
products:
  - name: Premium T-Shirt
    price: "29.99"
    category: Clothing
    stock: 50
  - name: Laptop Pro
    description: 16-inch
    price: "1299.00"
    category: Electronics
    stock: 3
"#;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let service = CatalogService::new(Arc::new(MemoryDocumentStore::new()));

        let seed: CatalogSeed = serde_yaml::from_str(SEED).unwrap();
        let first = apply(&service, seed).await.unwrap();
        assert_eq!(first.categories_added, 2);
        assert_eq!(first.products_added, 2);
        assert_eq!(first.skipped, 0);

        let seed: CatalogSeed = serde_yaml::from_str(SEED).unwrap();
        let second = apply(&service, seed).await.unwrap();
        assert_eq!(second.categories_added, 0);
        assert_eq!(second.products_added, 0);
        assert_eq!(second.skipped, 4);

        let products = service
            .list_products(&ProductQuery::default())
            .await
            .unwrap();
        assert_eq!(products.len(), 2);
    }

    #[tokio::test]
    async fn test_product_with_unknown_category_fails() {
        let service = CatalogService::new(Arc::new(MemoryDocumentStore::new()));
        let seed: CatalogSeed = serde_yaml::from_str(
            "products:\n  - name: Mug\n    price: \"9.50\"\n    category: Kitchen\n",
        )
        .unwrap();

        let err = apply(&service, seed).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Catalog(CatalogError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_negative_price_is_rejected_at_parse() {
        let result = serde_yaml::from_str::<CatalogSeed>(
            "categories: [Kitchen]\nproducts:\n  - name: Mug\n    price: \"-9.50\"\n    category: Kitchen\n",
        );
        assert!(result.is_err());
    }
}
