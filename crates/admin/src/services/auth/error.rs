//! Admin authentication error types.

use modern_shop_core::docstore::DocumentStoreError;
use thiserror::Error;

/// Errors that can occur during admin authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] modern_shop_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Signed in, but the account holds no admin role.
    #[error("not an administrator")]
    NotAdministrator,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Document store error.
    #[error("document store error: {0}")]
    Documents(#[from] DocumentStoreError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
