//! Checkout and order confirmation handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use modern_shop_core::order::{CheckoutDetails, CustomerInfo, ORDERS_COLLECTION, Order, OrderError};
use modern_shop_core::{OrderId, PaymentMethod};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{ApiJson, Result, add_breadcrumb};
use crate::middleware::{VisitorCart, placed_orders, record_placed_order};
use crate::state::AppState;

/// Checkout form.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Place an order from the visitor's cart.
///
/// Answers `201 Created` with the order and a `Location` pointing at its
/// confirmation.
#[instrument(skip(state, session, request))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    VisitorCart(cart_id): VisitorCart,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<impl IntoResponse> {
    let customer = CustomerInfo::parse(
        &request.name,
        &request.email,
        &request.phone,
        &request.address,
    )?;
    let details = CheckoutDetails {
        customer,
        payment_method: request.payment_method,
        notes: request.notes,
        tax_rate: None,
    };

    let order = state
        .checkout()
        .submit_order(state.carts(), state.catalog(), &cart_id, details)
        .await?;

    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
    record_placed_order(&session, &order.id).await?;

    let location = format!("/api/orders/{}", order.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(order),
    ))
}

/// Confirmation for an order placed in this session.
///
/// Orders placed from other sessions are reported as not found.
#[instrument(skip(state, session))]
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id = OrderId::new(id);
    if !placed_orders(&session).await.contains(&id) {
        return Err(OrderError::NotFound(id).into());
    }

    let document = state
        .documents()
        .get(ORDERS_COLLECTION, id.as_str())
        .await?
        .ok_or_else(|| OrderError::NotFound(id.clone()))?;
    Ok(Json(document.decode(ORDERS_COLLECTION)?))
}
