//! Command implementations.

pub mod admin;
pub mod export;
pub mod migrate;
pub mod seed;

use std::sync::Arc;

use modern_shop_core::docstore::{DocumentStoreError, PgDocumentStore, SharedDocumentStore};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Failure to reach the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Neither `SHOP_DATABASE_URL` nor `DATABASE_URL` is set.
    #[error("Missing environment variable: SHOP_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document store error: {0}")]
    Documents(#[from] DocumentStoreError),
}

/// Database URL from the environment, loading `.env` first.
pub fn database_url() -> Result<SecretString, ConnectError> {
    dotenvy::dotenv().ok();

    std::env::var("SHOP_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(SecretString::from)
        .ok_or(ConnectError::MissingDatabaseUrl)
}

/// Connect and open the document store.
pub async fn connect_documents() -> Result<SharedDocumentStore, ConnectError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool: PgPool = modern_shop_admin::db::create_pool(&url).await?;
    Ok(Arc::new(PgDocumentStore::connect(pool).await?))
}
