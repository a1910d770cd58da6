//! Order administration and the live order feed.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, put},
};
use futures::Stream;
use modern_shop_core::order::{Order, OrderQuery};
use modern_shop_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{ApiJson, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Build the orders router (mounted under `/admin/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/stream", get(stream))
        .route("/orders/{id}", get(show).delete(destroy))
        .route("/orders/{id}/status", put(update_status))
}

/// Body of `PUT /orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// GET /admin/api/orders?status&search&sort&direction
#[instrument(skip(state))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list(&query).await?))
}

/// GET /admin/api/orders/stream
///
/// Sends the filtered order list as an `orders` event on connect and again
/// after every change. The subscription ends when the client disconnects.
async fn stream(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<OrderQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let (subscription, mut snapshots) = state.orders().watch().await?;
    tracing::debug!(admin = %admin.email, "Order feed opened");

    let events = async_stream::stream! {
        // Held for the life of the stream; dropping it stops the feed.
        let _subscription = subscription;
        while let Some(orders) = snapshots.recv().await {
            let orders = query.apply(orders);
            let data = serde_json::to_string(&orders).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to serialize order snapshot");
                "[]".to_string()
            });
            yield Ok(Event::default().event("orders").data(data));
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// GET /admin/api/orders/{id}
async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get(&OrderId::new(id)).await?))
}

/// PUT /admin/api/orders/{id}/status
///
/// Moving to `delivered` takes the items out of stock each time it is set.
#[instrument(skip(state, admin, request), fields(admin = %admin.email, status = %request.status))]
async fn update_status(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .set_status(state.catalog(), &OrderId::new(id), request.status)
        .await?;
    Ok(Json(order))
}

/// DELETE /admin/api/orders/{id}
#[instrument(skip(state, admin), fields(admin = %admin.email))]
async fn destroy(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.orders().delete(&OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
