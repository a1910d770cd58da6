//! Admin provisioning.
//!
//! # Usage
//!
//! ```bash
//! shop-cli admin create -e admin@example.com -p 'long-random-password'
//! ```

use modern_shop_admin::services::{AuthError, PasswordIdentityProvider, RoleDirectory};
use modern_shop_core::docstore::SharedDocumentStore;
use modern_shop_core::identity::UserRecord;
use modern_shop_core::{Email, Role};
use thiserror::Error;

use super::ConnectError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create an admin user.
pub async fn create_admin(email: &str, password: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(AuthError::from)?;
    let documents = super::connect_documents().await?;

    let user = provision(documents, &email, password).await?;
    tracing::info!(uid = %user.id, email = %user.email, "Admin user created");
    Ok(())
}

/// Write the user document and the canonical role document.
pub async fn provision(
    documents: SharedDocumentStore,
    email: &Email,
    password: &str,
) -> Result<UserRecord, AuthError> {
    let identity = PasswordIdentityProvider::new(documents.clone());
    let roles = RoleDirectory::new(documents);

    let user = identity.create_user(email, password, Role::Admin).await?;
    roles.grant_admin(&user.id, &user.email).await?;
    Ok(user)
}
