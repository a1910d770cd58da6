//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Health check
//! GET    /health/ready            - Readiness check
//!
//! # Catalog
//! GET    /api/products            - Product listing (search, category, price, stock filters)
//! GET    /api/products/{id}       - Product detail
//! GET    /api/categories          - Category listing
//!
//! # Cart (session scoped)
//! GET    /api/cart                - Current cart
//! POST   /api/cart/add            - Add a product
//! POST   /api/cart/update         - Set a line's quantity
//! POST   /api/cart/remove         - Remove a line
//! POST   /api/cart/clear          - Empty the cart
//!
//! # Checkout
//! POST   /api/checkout            - Place an order
//! GET    /api/orders/{id}         - Confirmation for an order placed in this session
//! ```

pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/categories", get(products::categories))
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::submit))
        .route("/orders/{id}", get(checkout::confirmation))
}

/// Create the main application router.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/api", api_routes())
}
