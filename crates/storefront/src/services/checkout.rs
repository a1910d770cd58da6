//! Checkout: cart to persisted order.

use std::sync::Arc;

use chrono::Utc;
use modern_shop_core::CartId;
use modern_shop_core::docstore::{DocumentStoreError, SharedDocumentStore, to_fields};
use modern_shop_core::order::{CheckoutDetails, ORDERS_COLLECTION, Order, OrderError};
use modern_shop_core::settings::{SETTINGS_COLLECTION, STORE_SETTINGS_ID, StoreSettings};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use super::email::OrderNotifier;
use crate::storage::StorageError;
use crate::stores::{CartStore, CatalogStore};

/// Errors that abort a checkout. When one is returned no order exists and
/// the cart is unchanged.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("failed to save order: {0}")]
    Documents(#[from] DocumentStoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Turns carts into orders.
#[derive(Clone)]
pub struct CheckoutService {
    documents: SharedDocumentStore,
    notifier: Option<Arc<dyn OrderNotifier>>,
    tax_rate: Option<Decimal>,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        documents: SharedDocumentStore,
        notifier: Option<Arc<dyn OrderNotifier>>,
        tax_rate: Option<Decimal>,
    ) -> Self {
        Self {
            documents,
            notifier,
            tax_rate,
        }
    }

    /// Submit the visitor's cart as an order.
    ///
    /// 1. Build the order from the cart and the current catalog snapshot
    /// 2. Persist it to the `orders` collection
    /// 3. Start the owner notification without waiting for it
    /// 4. Clear the cart
    ///
    /// # Errors
    ///
    /// Returns `OrderError` for an empty cart or a line whose product no
    /// longer exists, or an error if the order cannot be stored. A failure
    /// to clear the cart is logged, not returned, since the order exists.
    #[instrument(skip(self, carts, catalog, details), fields(cart_id = %cart_id))]
    pub async fn submit_order(
        &self,
        carts: &CartStore,
        catalog: &CatalogStore,
        cart_id: &CartId,
        details: CheckoutDetails,
    ) -> Result<Order, CheckoutError> {
        let cart = carts.get(cart_id).await?;
        let details = CheckoutDetails {
            tax_rate: details.tax_rate.or(self.tax_rate),
            ..details
        };
        let order = catalog
            .read(|c| Order::from_cart(&cart, c, details, Utc::now()))
            .await?;

        self.documents
            .set(ORDERS_COLLECTION, order.id.as_str(), to_fields(&order)?)
            .await?;
        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");

        self.spawn_notification(order.clone());

        if let Err(e) = carts.clear(cart_id).await {
            tracing::error!(order_id = %order.id, error = %e, "Failed to clear cart after checkout");
        }

        Ok(order)
    }

    fn spawn_notification(&self, order: Order) {
        let Some(notifier) = self.notifier.clone() else {
            tracing::debug!(order_id = %order.id, "Email not configured, skipping notification");
            return;
        };
        let documents = Arc::clone(&self.documents);

        tokio::spawn(async move {
            let settings = match documents.get(SETTINGS_COLLECTION, STORE_SETTINGS_ID).await {
                Ok(Some(doc)) => doc.decode::<StoreSettings>(SETTINGS_COLLECTION),
                Ok(None) => Ok(StoreSettings::default()),
                Err(e) => Err(e),
            };
            let recipient = match settings {
                Ok(StoreSettings {
                    store_email: Some(email),
                    ..
                }) => email,
                Ok(_) => {
                    tracing::debug!(order_id = %order.id, "No store email set, skipping notification");
                    return;
                }
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "Could not read store settings");
                    return;
                }
            };

            if let Err(e) = notifier.order_placed(&order, &recipient).await {
                tracing::warn!(order_id = %order.id, error = %e, "Order notification failed");
            }
        });
    }
}
