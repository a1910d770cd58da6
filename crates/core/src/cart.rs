//! Shopping cart: product references with quantities.
//!
//! A cart only stores `(product_id, quantity)` pairs. Prices and names are
//! looked up in a [`Catalog`] when totals are computed, and a product that
//! has since been deleted simply contributes nothing.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Product};
use crate::types::{Price, ProductId};

/// One cart line. `quantity` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    items: Vec<CartItem>,
}

impl Cart {
    /// Empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity currently held for `product_id` (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.items
            .iter()
            .find(|i| &i.product_id == product_id)
            .map_or(0, |i| i.quantity)
    }

    /// Add `quantity` units, merging into an existing line.
    ///
    /// Adding zero units is a no-op.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                product_id,
                quantity,
            }),
        }
    }

    /// Remove a line. Returns whether it was present.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.product_id != product_id);
        self.items.len() != before
    }

    /// Set the quantity of an existing line. `quantity <= 0` removes it.
    ///
    /// Setting a quantity for a product that is not in the cart is a no-op.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        let Ok(quantity) = u32::try_from(quantity.max(0)) else {
            // Larger than u32::MAX: keep the line, saturate.
            if let Some(item) = self.items.iter_mut().find(|i| &i.product_id == product_id) {
                item.quantity = u32::MAX;
            }
            return;
        };
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| &i.product_id == product_id) {
            item.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum of quantity times current catalog price.
    ///
    /// Lines whose product no longer exists contribute zero.
    #[must_use]
    pub fn total_price(&self, catalog: &Catalog) -> Price {
        self.items
            .iter()
            .filter_map(|i| catalog.get(&i.product_id).map(|p| p.price.times(i.quantity)))
            .sum()
    }

    /// Resolve every line against the catalog for display.
    #[must_use]
    pub fn resolve<'a>(&self, catalog: &'a Catalog) -> ResolvedCart<'a> {
        let mut lines = Vec::with_capacity(self.items.len());
        let mut missing = Vec::new();
        for item in &self.items {
            match catalog.get(&item.product_id) {
                Some(product) => lines.push(ResolvedLine {
                    product,
                    quantity: item.quantity,
                    line_total: product.price.times(item.quantity),
                }),
                None => missing.push(item.product_id.clone()),
            }
        }
        let total_price = lines.iter().map(|l| l.line_total).sum();
        ResolvedCart {
            lines,
            missing,
            total_items: self.total_items(),
            total_price,
        }
    }
}

/// A cart line joined with its catalog product.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLine<'a> {
    pub product: &'a Product,
    pub quantity: u32,
    pub line_total: Price,
}

/// Cart joined with the catalog. `missing` lists lines whose product was removed.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedCart<'a> {
    pub lines: Vec<ResolvedLine<'a>>,
    pub missing: Vec<ProductId>,
    pub total_items: u64,
    pub total_price: Price,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::NewProduct;

    fn catalog() -> (Catalog, ProductId, ProductId) {
        let mut catalog = Catalog::new();
        catalog.add_category("General").unwrap();
        let a = catalog
            .add_product(NewProduct {
                name: "A".to_string(),
                description: String::new(),
                price: Price::from_cents(1000),
                category: "General".to_string(),
                stock: 10,
                image_url: None,
            })
            .unwrap();
        let b = catalog
            .add_product(NewProduct {
                name: "B".to_string(),
                description: String::new(),
                price: Price::from_cents(500),
                category: "General".to_string(),
                stock: 10,
                image_url: None,
            })
            .unwrap();
        (catalog, a.id, b.id)
    }

    #[test]
    fn test_add_merges_lines() {
        let ids = ["a", "b", "a", "c", "a", "b"];
        let mut cart = Cart::new();
        for id in ids {
            cart.add(ProductId::new(id), 1);
        }
        assert_eq!(cart.total_items(), ids.len() as u64);
        assert_eq!(cart.items().len(), 3);
        assert_eq!(cart.quantity_of(&ProductId::new("a")), 3);
        assert_eq!(cart.quantity_of(&ProductId::new("b")), 2);
        assert_eq!(cart.quantity_of(&ProductId::new("c")), 1);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = Cart::new();
        cart.add(ProductId::new("a"), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_equals_remove() {
        let mut by_set = Cart::new();
        by_set.add(ProductId::new("a"), 2);
        by_set.add(ProductId::new("b"), 1);
        let mut by_remove = by_set.clone();

        by_set.set_quantity(&ProductId::new("a"), 0);
        by_remove.remove(&ProductId::new("a"));
        assert_eq!(by_set, by_remove);

        by_set.set_quantity(&ProductId::new("b"), -3);
        by_remove.remove(&ProductId::new("b"));
        assert_eq!(by_set, by_remove);
        assert!(by_set.is_empty());
    }

    #[test]
    fn test_set_quantity_ignores_unknown_line() {
        let mut cart = Cart::new();
        cart.set_quantity(&ProductId::new("a"), 4);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_total_price() {
        let (catalog, a, b) = catalog();
        let mut cart = Cart::new();
        cart.add(a, 2);
        cart.add(b, 1);
        assert_eq!(cart.total_price(&catalog), Price::from_cents(2500));
    }

    #[test]
    fn test_missing_product_contributes_zero() {
        let (mut catalog, a, b) = catalog();
        let mut cart = Cart::new();
        cart.add(a, 2);
        cart.add(b.clone(), 1);
        catalog.delete_product(&b);

        assert_eq!(cart.total_price(&catalog), Price::from_cents(2000));
        let resolved = cart.resolve(&catalog);
        assert_eq!(resolved.lines.len(), 1);
        assert_eq!(resolved.missing, vec![b]);
        assert_eq!(resolved.total_items, 3);
        assert_eq!(resolved.total_price, Price::from_cents(2000));
    }

    #[test]
    fn test_serde_shape() {
        let mut cart = Cart::new();
        cart.add(ProductId::new("a"), 2);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"items": [{"product_id": "a", "quantity": 2}]})
        );
    }
}
