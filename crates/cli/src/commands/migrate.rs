//! Database migration command.
//!
//! Applies `crates/core/migrations/` (the document table and its change
//! trigger) and creates the session table used by both servers.
//!
//! # Environment Variables
//!
//! - `SHOP_DATABASE_URL` - `PostgreSQL` connection string

use tower_sessions_sqlx_store::PostgresStore;

use super::ConnectError;

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store migration error: {0}")]
    Sessions(#[from] sqlx::Error),
}

/// Run all migrations.
pub async fn run() -> Result<(), MigrationError> {
    let url = super::database_url()?;

    tracing::info!("Connecting to database...");
    let pool = modern_shop_admin::db::create_pool(&url)
        .await
        .map_err(ConnectError::from)?;

    tracing::info!("Running document store migrations...");
    sqlx::migrate!("../core/migrations").run(&pool).await?;

    tracing::info!("Running session store migrations...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
