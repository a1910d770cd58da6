//! Per-visitor carts persisted in local storage.

use modern_shop_core::cart::Cart;
use modern_shop_core::{CartId, ProductId};
use tokio::sync::Mutex;

use crate::storage::{Persisted, SharedKeyValueStore, StorageError};

/// Key prefix for carts; the full key is `cart-storage/<cart-id>`.
pub const CART_KEY_PREFIX: &str = "cart-storage";

const CART_VERSION: u32 = 1;

/// Cart storage. Every mutation is load, modify, save under one lock.
pub struct CartStore {
    kv: SharedKeyValueStore,
    write_lock: Mutex<()>,
}

impl CartStore {
    #[must_use]
    pub fn new(kv: SharedKeyValueStore) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    fn persisted(&self, cart_id: &CartId) -> Persisted<Cart> {
        Persisted::new(
            self.kv.clone(),
            format!("{CART_KEY_PREFIX}/{cart_id}"),
            CART_VERSION,
        )
    }

    /// Current contents; a cart that was never saved is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn get(&self, cart_id: &CartId) -> Result<Cart, StorageError> {
        Ok(self.persisted(cart_id).load().await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn add(
        &self,
        cart_id: &CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, StorageError> {
        self.update(cart_id, |cart| cart.add(product_id, quantity))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn set_quantity(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Cart, StorageError> {
        self.update(cart_id, |cart| cart.set_quantity(product_id, quantity))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn remove(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
    ) -> Result<Cart, StorageError> {
        self.update(cart_id, |cart| {
            cart.remove(product_id);
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn clear(&self, cart_id: &CartId) -> Result<Cart, StorageError> {
        self.update(cart_id, Cart::clear).await
    }

    async fn update(
        &self,
        cart_id: &CartId,
        f: impl FnOnce(&mut Cart),
    ) -> Result<Cart, StorageError> {
        let _guard = self.write_lock.lock().await;
        let persisted = self.persisted(cart_id);
        let mut cart = persisted.load().await?.unwrap_or_default();
        f(&mut cart);
        persisted.save(&cart).await?;
        Ok(cart)
    }
}
