//! Order administration: listing, status changes, deletion, live feed.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use modern_shop_core::catalog::CatalogError;
use modern_shop_core::docstore::{
    Collection, SharedDocumentStore, Subscription, decode_all, subscribe, to_fields,
};
use modern_shop_core::order::{ORDERS_COLLECTION, Order, OrderError, OrderQuery, orders_between};
use modern_shop_core::{OrderId, OrderStatus};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::instrument;

use super::{CatalogService, ServiceError};

/// Order management.
pub struct OrderService {
    documents: SharedDocumentStore,
    orders: Collection<Order>,
}

impl OrderService {
    #[must_use]
    pub fn new(documents: SharedDocumentStore) -> Self {
        Self {
            orders: Collection::new(Arc::clone(&documents), ORDERS_COLLECTION),
            documents,
        }
    }

    /// Every stored order, unsorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store fails.
    pub async fn all(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self.orders.list().await?)
    }

    /// Filtered and sorted listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store fails.
    pub async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, ServiceError> {
        Ok(query.apply(self.all().await?))
    }

    /// Orders created between `from` and `to`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store fails.
    pub async fn between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Order>, ServiceError> {
        Ok(orders_between(self.all().await?, from, to))
    }

    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown id.
    pub async fn get(&self, id: &OrderId) -> Result<Order, ServiceError> {
        self.orders
            .get(id.as_str())
            .await?
            .ok_or_else(|| OrderError::NotFound(id.clone()).into())
    }

    /// Change an order's status.
    ///
    /// Any status may follow any other. Setting `delivered` first takes each
    /// line item's quantity out of stock, then saves the status. The steps
    /// are not atomic: a failure part way leaves earlier decrements applied
    /// and the status unchanged. Products deleted since checkout are skipped.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown id, or a store error.
    #[instrument(skip(self, catalog))]
    pub async fn set_status(
        &self,
        catalog: &CatalogService,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let mut order = self.get(id).await?;

        if status.consumes_stock() {
            for item in &order.items {
                match catalog.decrement_stock(&item.product_id, item.quantity).await {
                    Ok(_) => {}
                    Err(ServiceError::Catalog(CatalogError::ProductNotFound(_))) => {
                        tracing::warn!(
                            order_id = %id,
                            product_id = %item.product_id,
                            "Delivered item's product no longer exists, stock not adjusted"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let now = Utc::now();
        let patch = json!({ "status": status, "updated_at": now });
        self.orders.update(id.as_str(), to_fields(&patch)?).await?;
        tracing::info!(order_id = %id, from = %order.status, to = %status, "Order status changed");

        order.status = status;
        order.updated_at = now;
        Ok(order)
    }

    /// Delete an order. Stock is not restored.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if there was nothing to delete.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &OrderId) -> Result<(), ServiceError> {
        if !self.orders.delete(id.as_str()).await? {
            return Err(OrderError::NotFound(id.clone()).into());
        }
        tracing::info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Live snapshots of the order collection.
    ///
    /// The current orders arrive first, then a new snapshot after each
    /// change. Dropping the returned [`Subscription`] stops the feed.
    ///
    /// # Errors
    ///
    /// Returns an error if change notifications cannot be set up.
    pub async fn watch(
        &self,
    ) -> Result<(Subscription, mpsc::UnboundedReceiver<Vec<Order>>), ServiceError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = subscribe(
            Arc::clone(&self.documents),
            ORDERS_COLLECTION,
            move |documents| {
                let _ = tx.send(decode_all::<Order>(ORDERS_COLLECTION, &documents));
            },
        )
        .await?;
        Ok((subscription, rx))
    }
}
