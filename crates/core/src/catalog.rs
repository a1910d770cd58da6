//! Product catalog: products, categories and their invariants.
//!
//! [`Catalog`] is a plain value. The storefront keeps one as a persisted
//! snapshot and the admin console applies the same rules to documents in
//! the document store through the free functions in this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::docstore::{DocumentStore, DocumentStoreError, decode_all};
use crate::types::{Price, ProductId};

/// Errors raised by catalog mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No product with this id.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A category with this name already exists.
    #[error("category already exists: {0}")]
    DuplicateCategory(String),

    /// The category is still referenced by products.
    #[error("category {category} is used by {products} product(s)")]
    CategoryInUse {
        /// Category name.
        category: String,
        /// Number of products referencing it.
        products: usize,
    },

    /// A product references a category that does not exist.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),
}

/// A category label. Unique within a catalog, compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Create a category from a label, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the label is blank.
    pub fn parse(name: &str) -> Result<Self, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation(
                "category name cannot be empty".to_string(),
            ));
        }
        Ok(Self(name.to_owned()))
    }

    /// The label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    pub category: Category,
    pub stock: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least `quantity` units are available.
    #[must_use]
    pub const fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    pub category: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewProduct {
    /// Validate against the known categories and build the product.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name and `UnknownCategory` when
    /// the category is not in `categories`.
    pub fn into_product(
        self,
        id: ProductId,
        categories: &[Category],
        now: DateTime<Utc>,
    ) -> Result<Product, CatalogError> {
        let name = validate_name(&self.name)?;
        let category = resolve_category(&self.category, categories)?;
        Ok(Product {
            id,
            name,
            description: self.description.trim().to_owned(),
            price: self.price,
            category,
            stock: self.stock,
            image_url: normalize_url(self.image_url),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for a product. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductPatch {
    /// Apply the patch to `product`, validating changed fields.
    ///
    /// The product is left untouched when validation fails.
    ///
    /// # Errors
    ///
    /// Same rules as [`NewProduct::into_product`].
    pub fn apply(
        &self,
        product: &mut Product,
        categories: &[Category],
        now: DateTime<Utc>,
    ) -> Result<(), CatalogError> {
        let name = self.name.as_deref().map(validate_name).transpose()?;
        let category = self
            .category
            .as_deref()
            .map(|c| resolve_category(c, categories))
            .transpose()?;

        if let Some(name) = name {
            product.name = name;
        }
        if let Some(category) = category {
            product.category = category;
        }
        if let Some(description) = &self.description {
            description.trim().clone_into(&mut product.description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if self.image_url.is_some() {
            product.image_url = normalize_url(self.image_url.clone());
        }
        product.updated_at = now;
        Ok(())
    }
}

/// Filters for product listings. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    /// Case-insensitive substring of the name or description.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<Price>,
    #[serde(default)]
    pub max_price: Option<Price>,
    /// Only products with stock > 0.
    #[serde(default)]
    pub in_stock: Option<bool>,
}

impl ProductQuery {
    /// Whether `product` passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !product.name.to_lowercase().contains(&term)
                && !product.description.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        let category = self.category.as_deref().filter(|c| !c.is_empty());
        if category.is_some_and(|c| product.category.as_str() != c) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.in_stock == Some(true) && product.stock == 0 {
            return false;
        }
        true
    }
}

/// Stock left after removing `amount` units; never below zero.
#[must_use]
pub const fn decremented_stock(stock: u32, amount: u32) -> u32 {
    stock.saturating_sub(amount)
}

/// Check that `category` can be removed given the current products.
///
/// # Errors
///
/// Returns `CategoryInUse` if any product references it.
pub fn ensure_category_unused<'a>(
    category: &str,
    products: impl IntoIterator<Item = &'a Product>,
) -> Result<(), CatalogError> {
    let in_use = products
        .into_iter()
        .filter(|p| p.category.as_str() == category)
        .count();
    if in_use > 0 {
        return Err(CatalogError::CategoryInUse {
            category: category.to_owned(),
            products: in_use,
        });
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Validation(
            "product name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_owned())
}

fn resolve_category(name: &str, categories: &[Category]) -> Result<Category, CatalogError> {
    let category = Category::parse(name)?;
    if !categories.contains(&category) {
        return Err(CatalogError::UnknownCategory(category.0));
    }
    Ok(category)
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_owned()).filter(|u| !u.is_empty())
}

/// In-memory catalog of products and categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    products: Vec<Product>,
    categories: Vec<Category>,
}

impl Catalog {
    /// Empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            products: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// Build a catalog from existing records (e.g. loaded from the document store).
    ///
    /// Duplicate categories are collapsed. Products are kept as-is even if
    /// their category is missing, so that a snapshot never loses data.
    #[must_use]
    pub fn from_parts(products: Vec<Product>, categories: Vec<Category>) -> Self {
        let mut unique: Vec<Category> = Vec::with_capacity(categories.len());
        for category in categories {
            if !unique.contains(&category) {
                unique.push(category);
            }
        }
        Self {
            products,
            categories: unique,
        }
    }

    /// All products, in insertion order.
    #[must_use]
    pub fn list_products(&self) -> &[Product] {
        &self.products
    }

    /// All categories, in insertion order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Products matching `query`.
    #[must_use]
    pub fn search(&self, query: &ProductQuery) -> Vec<&Product> {
        self.products.iter().filter(|p| query.matches(p)).collect()
    }

    /// Whether `quantity` units of the product are available.
    ///
    /// Unknown products have no stock.
    #[must_use]
    pub fn check_stock(&self, id: &ProductId, quantity: u32) -> bool {
        self.get(id).is_some_and(|p| p.has_stock(quantity))
    }

    /// Add a product, assigning a fresh id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns `Validation` or `UnknownCategory` if the input is invalid.
    pub fn add_product(&mut self, new: NewProduct) -> Result<Product, CatalogError> {
        let product = new.into_product(ProductId::generate(), &self.categories, Utc::now())?;
        self.products.push(product.clone());
        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` for an unknown id, or a validation error.
    pub fn update_product(
        &mut self,
        id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, CatalogError> {
        let product = self
            .products
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CatalogError::ProductNotFound(id.clone()))?;
        patch.apply(product, &self.categories, Utc::now())?;
        Ok(product.clone())
    }

    /// Remove a product. Orders keep their own snapshot, so no reference check.
    ///
    /// Returns the removed product, or `None` if it was already gone.
    pub fn delete_product(&mut self, id: &ProductId) -> Option<Product> {
        let index = self.products.iter().position(|p| &p.id == id)?;
        Some(self.products.remove(index))
    }

    /// Register a new category.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCategory` if it already exists.
    pub fn add_category(&mut self, name: &str) -> Result<Category, CatalogError> {
        let category = Category::parse(name)?;
        if self.categories.contains(&category) {
            return Err(CatalogError::DuplicateCategory(category.0));
        }
        self.categories.push(category.clone());
        Ok(category)
    }

    /// Remove a category. Removing an unknown category is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CategoryInUse` if any product references it; the catalog
    /// is left unchanged.
    pub fn delete_category(&mut self, name: &str) -> Result<(), CatalogError> {
        let name = name.trim();
        ensure_category_unused(name, &self.products)?;
        self.categories.retain(|c| c.as_str() != name);
        Ok(())
    }

    /// Remove `amount` units of stock, clamping at zero.
    ///
    /// Returns the new stock level.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` for an unknown id.
    pub fn decrement_stock(&mut self, id: &ProductId, amount: u32) -> Result<u32, CatalogError> {
        let product = self
            .products
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CatalogError::ProductNotFound(id.clone()))?;
        product.stock = decremented_stock(product.stock, amount);
        product.updated_at = Utc::now();
        Ok(product.stock)
    }
}

/// Document collection holding products.
pub const PRODUCTS_COLLECTION: &str = "products";

/// Document collection holding categories. The document id is the label.
pub const CATEGORIES_COLLECTION: &str = "categories";

/// Stored category document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: Category,
}

impl CategoryRecord {
    #[must_use]
    pub fn new(category: Category) -> Self {
        Self {
            id: category.as_str().to_owned(),
            name: category,
        }
    }
}

/// Read the whole catalog from the document store.
///
/// Documents that fail to decode are skipped with a warning.
///
/// # Errors
///
/// Returns an error if either collection cannot be listed.
pub async fn load_catalog(store: &dyn DocumentStore) -> Result<Catalog, DocumentStoreError> {
    let products = store.list(PRODUCTS_COLLECTION).await?;
    let categories = store.list(CATEGORIES_COLLECTION).await?;
    let categories: Vec<CategoryRecord> = decode_all(CATEGORIES_COLLECTION, &categories);
    Ok(Catalog::from_parts(
        decode_all(PRODUCTS_COLLECTION, &products),
        categories.into_iter().map(|c| c.name).collect(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_product(name: &str, cents: u64, category: &str, stock: u32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            price: Price::from_cents(cents),
            category: category.to_string(),
            stock,
            image_url: None,
        }
    }

    fn catalog_with(categories: &[&str]) -> Catalog {
        let mut catalog = Catalog::new();
        for c in categories {
            catalog.add_category(c).unwrap();
        }
        catalog
    }

    #[test]
    fn test_add_product_assigns_id_and_timestamps() {
        let mut catalog = catalog_with(&["Books"]);
        let product = catalog
            .add_product(new_product("  Rust Book ", 3999, "Books", 3))
            .unwrap();
        assert_eq!(product.name, "Rust Book");
        assert!(!product.id.as_str().is_empty());
        assert_eq!(product.created_at, product.updated_at);
        assert_eq!(catalog.list_products().len(), 1);
    }

    #[test]
    fn test_add_product_requires_known_category() {
        let mut catalog = catalog_with(&["Books"]);
        let err = catalog
            .add_product(new_product("Phone", 100, "Electronics", 1))
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownCategory("Electronics".to_string()));
        assert!(catalog.list_products().is_empty());
    }

    #[test]
    fn test_add_product_rejects_blank_name() {
        let mut catalog = catalog_with(&["Books"]);
        assert!(matches!(
            catalog.add_product(new_product("   ", 100, "Books", 1)),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_negative_price_does_not_decode() {
        let new = serde_json::from_value::<NewProduct>(serde_json::json!({
            "name": "Bad",
            "price": "-5.00",
            "category": "Books",
            "stock": 1
        }));
        assert!(new.is_err());

        let patch = serde_json::from_value::<ProductPatch>(serde_json::json!({
            "price": "-0.01"
        }));
        assert!(patch.is_err());
    }

    #[test]
    fn test_update_product_not_found() {
        let mut catalog = catalog_with(&["Books"]);
        let err = catalog
            .update_product(&ProductId::new("missing"), &ProductPatch::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(_)));
    }

    #[test]
    fn test_update_product_partial() {
        let mut catalog = catalog_with(&["Books", "Music"]);
        let product = catalog
            .add_product(new_product("Album", 1500, "Books", 2))
            .unwrap();
        let patch = ProductPatch {
            category: Some("Music".to_string()),
            stock: Some(9),
            ..ProductPatch::default()
        };
        let updated = catalog.update_product(&product.id, &patch).unwrap();
        assert_eq!(updated.category.as_str(), "Music");
        assert_eq!(updated.stock, 9);
        assert_eq!(updated.name, "Album");
        assert_eq!(updated.price, Price::from_cents(1500));
    }

    #[test]
    fn test_failed_patch_leaves_product_unchanged() {
        let mut catalog = catalog_with(&["Books"]);
        let product = catalog
            .add_product(new_product("Album", 1500, "Books", 2))
            .unwrap();
        let patch = ProductPatch {
            stock: Some(0),
            category: Some("Nope".to_string()),
            ..ProductPatch::default()
        };
        assert!(catalog.update_product(&product.id, &patch).is_err());
        assert_eq!(catalog.get(&product.id).unwrap().stock, 2);
    }

    #[test]
    fn test_delete_product_is_idempotent() {
        let mut catalog = catalog_with(&["Books"]);
        let product = catalog
            .add_product(new_product("Album", 1500, "Books", 2))
            .unwrap();
        assert!(catalog.delete_product(&product.id).is_some());
        assert!(catalog.delete_product(&product.id).is_none());
    }

    #[test]
    fn test_add_category_duplicate() {
        let mut catalog = catalog_with(&["Books"]);
        assert_eq!(
            catalog.add_category(" Books ").unwrap_err(),
            CatalogError::DuplicateCategory("Books".to_string())
        );
        assert_eq!(catalog.categories().len(), 1);
    }

    #[test]
    fn test_delete_category_in_use_scenario() {
        let mut catalog = catalog_with(&["Electronics", "Books"]);
        catalog
            .add_product(new_product("Phone", 69999, "Electronics", 10))
            .unwrap();

        let err = catalog.delete_category("Electronics").unwrap_err();
        assert!(matches!(err, CatalogError::CategoryInUse { products: 1, .. }));
        assert_eq!(catalog.categories().len(), 2);

        catalog.delete_category("Books").unwrap();
        let names: Vec<_> = catalog.categories().iter().map(Category::as_str).collect();
        assert_eq!(names, vec!["Electronics"]);
    }

    #[test]
    fn test_decrement_stock_clamps_at_zero() {
        let mut catalog = catalog_with(&["Books"]);
        let product = catalog
            .add_product(new_product("Album", 1500, "Books", 2))
            .unwrap();
        assert_eq!(catalog.decrement_stock(&product.id, 1).unwrap(), 1);
        assert_eq!(catalog.decrement_stock(&product.id, 50).unwrap(), 0);
        assert_eq!(catalog.decrement_stock(&product.id, u32::MAX).unwrap(), 0);
    }

    #[test]
    fn test_decremented_stock_never_underflows() {
        for stock in [0_u32, 1, 5, u32::MAX] {
            for amount in [0_u32, 1, 5, u32::MAX] {
                let left = decremented_stock(stock, amount);
                assert!(left <= stock);
                assert_eq!(left, stock.saturating_sub(amount));
            }
        }
    }

    #[test]
    fn test_check_stock() {
        let mut catalog = catalog_with(&["Books"]);
        let product = catalog
            .add_product(new_product("Album", 1500, "Books", 2))
            .unwrap();
        assert!(catalog.check_stock(&product.id, 2));
        assert!(!catalog.check_stock(&product.id, 3));
        assert!(!catalog.check_stock(&ProductId::new("missing"), 1));
    }

    #[test]
    fn test_search_filters() {
        let mut catalog = catalog_with(&["Electronics", "Clothing"]);
        catalog
            .add_product(new_product("Laptop Pro", 129_999, "Electronics", 5))
            .unwrap();
        catalog
            .add_product(new_product("Smartphone XYZ", 69_999, "Electronics", 0))
            .unwrap();
        catalog
            .add_product(new_product("Premium T-Shirt", 2999, "Clothing", 20))
            .unwrap();

        let query = ProductQuery {
            search: Some("LAPTOP".to_string()),
            ..ProductQuery::default()
        };
        assert_eq!(catalog.search(&query).len(), 1);

        let query = ProductQuery {
            category: Some("Electronics".to_string()),
            in_stock: Some(true),
            ..ProductQuery::default()
        };
        let names: Vec<_> = catalog.search(&query).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Laptop Pro"]);

        let query = ProductQuery {
            max_price: Some(Price::from_cents(70_000)),
            ..ProductQuery::default()
        };
        assert_eq!(catalog.search(&query).len(), 2);
    }

    #[test]
    fn test_from_parts_dedups_categories() {
        let books = Category::parse("Books").unwrap();
        let catalog = Catalog::from_parts(Vec::new(), vec![books.clone(), books]);
        assert_eq!(catalog.categories().len(), 1);
    }

    #[tokio::test]
    async fn test_load_catalog_from_documents() {
        use crate::docstore::{MemoryDocumentStore, to_fields};

        let store = MemoryDocumentStore::new();
        let books = Category::parse("Books").unwrap();
        let record = CategoryRecord::new(books.clone());
        store
            .set(CATEGORIES_COLLECTION, &record.id, to_fields(&record).unwrap())
            .await
            .unwrap();

        let mut scratch = Catalog::from_parts(Vec::new(), vec![books]);
        let product = scratch.add_product(new_product("Novel", 1500, "Books", 4)).unwrap();
        store
            .set(PRODUCTS_COLLECTION, product.id.as_str(), to_fields(&product).unwrap())
            .await
            .unwrap();
        store
            .add(PRODUCTS_COLLECTION, to_fields(&serde_json::json!({"name": 1})).unwrap())
            .await
            .unwrap();

        let loaded = load_catalog(&store).await.unwrap();
        assert_eq!(loaded.list_products(), &[product]);
        assert_eq!(loaded.categories()[0].as_str(), "Books");
    }
}
