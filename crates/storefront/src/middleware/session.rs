//! Session middleware configuration and visitor-cart extraction.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use modern_shop_core::{CartId, OrderId};
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;
use crate::models::session_keys;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shop_session";

/// Session expiry time in seconds (30 days).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Orders remembered per session for the confirmation page.
const MAX_PLACED_ORDERS: usize = 20;

/// Create the session layer over any session store.
///
/// The storefront uses `PostgresStore` when a database is configured and
/// `MemoryStore` otherwise.
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    config: &StorefrontConfig,
) -> SessionManagerLayer<S> {
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Extractor for the visitor's cart id, assigning one on first use.
///
/// ```rust,ignore
/// async fn handler(VisitorCart(cart_id): VisitorCart) -> impl IntoResponse {
///     cart_id.to_string()
/// }
/// ```
#[derive(Debug)]
pub struct VisitorCart(pub CartId);

/// Error returned when the session layer is missing or the session store fails.
pub struct SessionUnavailable;

impl IntoResponse for SessionUnavailable {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response()
    }
}

impl<S> FromRequestParts<S> for VisitorCart
where
    S: Send + Sync,
{
    type Rejection = SessionUnavailable;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(SessionUnavailable)?;

        let existing = session
            .get::<CartId>(session_keys::CART_ID)
            .await
            .map_err(|e| {
                tracing::error!("Failed to read cart id from session: {e}");
                SessionUnavailable
            })?;

        if let Some(cart_id) = existing {
            return Ok(Self(cart_id));
        }

        let cart_id = CartId::generate();
        session
            .insert(session_keys::CART_ID, &cart_id)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save cart id to session: {e}");
                SessionUnavailable
            })?;
        tracing::debug!(cart_id = %cart_id, "Assigned new cart");
        Ok(Self(cart_id))
    }
}

/// Orders placed in this session, newest last.
pub async fn placed_orders(session: &Session) -> Vec<OrderId> {
    session
        .get::<Vec<OrderId>>(session_keys::PLACED_ORDERS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Remember that this session placed `order_id`.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn record_placed_order(
    session: &Session,
    order_id: &OrderId,
) -> Result<(), tower_sessions::session::Error> {
    let mut orders = placed_orders(session).await;
    orders.push(order_id.clone());
    if orders.len() > MAX_PLACED_ORDERS {
        orders.drain(..orders.len() - MAX_PLACED_ORDERS);
    }
    session.insert(session_keys::PLACED_ORDERS, orders).await
}
