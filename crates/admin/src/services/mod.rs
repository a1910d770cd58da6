//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Sign-in and role checks
//! - `catalog` - Products and categories
//! - `orders` - Order status, deletion and live feed
//! - `settings` - Store name and notification address
//! - `upload` - Product image hosting

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod settings;
pub mod upload;

use modern_shop_core::catalog::CatalogError;
use modern_shop_core::docstore::DocumentStoreError;
use modern_shop_core::order::OrderError;
use thiserror::Error;

pub use auth::{AuthError, IdentityProvider, PasswordIdentityProvider, RoleDirectory};
pub use catalog::CatalogService;
pub use orders::OrderService;
pub use settings::SettingsService;
pub use upload::{ImageHost, ImgbbClient, UploadError};

/// Errors from the document-backed services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Documents(#[from] DocumentStoreError),
}
