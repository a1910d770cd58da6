//! Cart route handlers.
//!
//! The cart id is kept in the visitor's session; cart contents live in
//! local storage. Every handler answers with the full cart view.

use axum::{Json, extract::State};
use modern_shop_core::cart::Cart;
use modern_shop_core::catalog::{Catalog, CatalogError};
use modern_shop_core::{Price, ProductId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ApiJson, AppError, Result, add_breadcrumb};
use crate::middleware::VisitorCart;
use crate::state::AppState;

/// One resolved cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
    pub image_url: Option<String>,
    pub stock: u32,
}

/// Cart as shown to the visitor.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    /// Lines whose product has been removed from the catalog.
    pub unavailable: Vec<ProductId>,
    pub total_items: u64,
    pub total_price: Price,
}

impl CartView {
    #[must_use]
    pub fn build(cart: &Cart, catalog: &Catalog) -> Self {
        let resolved = cart.resolve(catalog);
        Self {
            items: resolved
                .lines
                .iter()
                .map(|line| CartLineView {
                    product_id: line.product.id.clone(),
                    name: line.product.name.clone(),
                    unit_price: line.product.price,
                    quantity: line.quantity,
                    line_total: line.line_total,
                    image_url: line.product.image_url.clone(),
                    stock: line.product.stock,
                })
                .collect(),
            unavailable: resolved.missing,
            total_items: resolved.total_items,
            total_price: resolved.total_price,
        }
    }
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update quantity request. Zero or negative removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove line request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
}

async fn view(state: &AppState, cart: &Cart) -> CartView {
    state.catalog().read(|c| CartView::build(cart, c)).await
}

/// Check that `wanted` units of a product can be held in a cart.
async fn ensure_available(state: &AppState, product_id: &ProductId, wanted: u64) -> Result<()> {
    let product = state
        .catalog()
        .get(product_id)
        .await
        .ok_or_else(|| CatalogError::ProductNotFound(product_id.clone()))?;
    if wanted > u64::from(product.stock) {
        return Err(AppError::BadRequest(format!(
            "Only {} of {} in stock",
            product.stock, product.name
        )));
    }
    Ok(())
}

/// Show the cart.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    VisitorCart(cart_id): VisitorCart,
) -> Result<Json<CartView>> {
    let cart = state.carts().get(&cart_id).await?;
    Ok(Json(view(&state, &cart).await))
}

/// Add a product (default quantity 1), merging with an existing line.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    VisitorCart(cart_id): VisitorCart,
    ApiJson(request): ApiJson<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let quantity = request.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(AppError::BadRequest("Quantity must be at least 1".to_string()));
    }

    let current = state.carts().get(&cart_id).await?;
    let wanted = u64::from(current.quantity_of(&request.product_id)) + u64::from(quantity);
    ensure_available(&state, &request.product_id, wanted).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", request.product_id.as_str())]),
    );
    let cart = state
        .carts()
        .add(&cart_id, request.product_id, quantity)
        .await?;
    Ok(Json(view(&state, &cart).await))
}

/// Set a line's quantity.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    VisitorCart(cart_id): VisitorCart,
    ApiJson(request): ApiJson<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    if let Ok(wanted @ 1..) = u64::try_from(request.quantity) {
        ensure_available(&state, &request.product_id, wanted).await?;
    }
    let cart = state
        .carts()
        .set_quantity(&cart_id, &request.product_id, request.quantity)
        .await?;
    Ok(Json(view(&state, &cart).await))
}

/// Remove a line.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    VisitorCart(cart_id): VisitorCart,
    ApiJson(request): ApiJson<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .remove(&cart_id, &request.product_id)
        .await?;
    Ok(Json(view(&state, &cart).await))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    VisitorCart(cart_id): VisitorCart,
) -> Result<Json<CartView>> {
    let cart = state.carts().clear(&cart_id).await?;
    Ok(Json(view(&state, &cart).await))
}
