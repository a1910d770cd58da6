//! Customer-facing state containers.
//!
//! Both stores are owned by [`AppState`](crate::state::AppState), guard
//! their state with a `tokio::sync` lock and persist after every mutation.

pub mod cart;
pub mod catalog;

use modern_shop_core::catalog::CatalogError;
use thiserror::Error;

use crate::storage::StorageError;

pub use cart::CartStore;
pub use catalog::{CatalogStore, sample_catalog};

/// Errors from store mutations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The mutation broke a catalog rule; nothing was changed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The new state could not be persisted; nothing was changed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
