//! Session-related types.
//!
//! A visitor's session only carries identifiers; the cart itself lives in
//! local storage and orders in the document store.

/// Session keys for visitor state.
pub mod keys {
    /// Key for the visitor's cart id.
    pub const CART_ID: &str = "cart_id";

    /// Key for ids of orders placed in this session (confirmation access).
    pub const PLACED_ORDERS: &str = "placed_orders";
}
