//! Session-related types for admin authentication.

use serde::{Deserialize, Serialize};

use modern_shop_core::{Email, UserId};

/// Session-stored admin identity.
///
/// Written only after the role check passed at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub uid: UserId,
    pub email: Email,
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
