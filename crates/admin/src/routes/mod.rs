//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /login                          - Login form
//! POST /login                          - Sign in
//! POST /logout                         - Sign out
//! GET  /admin                          - Dashboard summary
//!
//! # JSON API (401 when signed out)
//! GET/POST       /admin/api/products
//! GET/PATCH/DELETE /admin/api/products/{id}
//! GET/POST       /admin/api/categories
//! DELETE         /admin/api/categories/{name}
//! GET            /admin/api/orders?status&search&sort&direction
//! GET            /admin/api/orders/stream     - Server-sent snapshots
//! GET/DELETE     /admin/api/orders/{id}
//! PUT            /admin/api/orders/{id}/status
//! GET            /admin/api/analytics
//! GET            /admin/api/reports/sales(.csv)?from&to
//! GET            /admin/api/customers
//! GET            /admin/api/export/orders?from&to&sheet
//! GET/PUT        /admin/api/settings
//! POST           /admin/api/uploads/image
//! ```

pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod export;
pub mod orders;
pub mod products;
pub mod settings;
pub mod uploads;

use axum::Router;

use crate::state::AppState;

/// JSON endpoints, nested under `/admin/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(products::router())
        .merge(orders::router())
        .merge(analytics::router())
        .merge(export::router())
        .merge(settings::router())
        .merge(uploads::router())
}

/// Build the complete admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .nest("/admin/api", api_routes())
}
