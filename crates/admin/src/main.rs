//! Modern Shop Admin - Store administration console.
//!
//! This binary serves the admin console on port 3001.
//!
//! # Architecture
//!
//! - Axum web framework with a plain HTML login form and JSON handlers
//! - Products, categories, orders and settings in the shared document store
//! - Password sign-in checked against the `admins` role collection
//! - `PostgreSQL` for documents and sessions when configured, memory otherwise

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use modern_shop_admin::app::build_router;
use modern_shop_admin::config::AdminConfig;
use modern_shop_admin::db;
use modern_shop_admin::services::{IdentityProvider, ImageHost, ImgbbClient, PasswordIdentityProvider};
use modern_shop_admin::state::AppState;
use modern_shop_core::docstore::{MemoryDocumentStore, PgDocumentStore, SharedDocumentStore};
use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized for admin");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let config = AdminConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "modern_shop_admin=info,tower_http=debug".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p modern-shop-cli -- migrate
    let pool = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            Some(pool)
        }
        None => {
            tracing::warn!("No database configured, documents and sessions are kept in memory");
            None
        }
    };

    let documents: SharedDocumentStore = match &pool {
        Some(pool) => Arc::new(
            PgDocumentStore::connect(pool.clone())
                .await
                .expect("Failed to connect document store"),
        ),
        None => Arc::new(MemoryDocumentStore::new()),
    };

    let identity: Arc<dyn IdentityProvider> =
        Arc::new(PasswordIdentityProvider::new(Arc::clone(&documents)));

    let image_host: Option<Arc<dyn ImageHost>> = config.image_host.as_ref().map(|host| {
        let client = ImgbbClient::new(host).expect("Failed to build image host client");
        Arc::new(client) as Arc<dyn ImageHost>
    });
    if image_host.is_none() {
        tracing::info!("IMGBB_API_KEY not set, image uploads disabled");
    }

    let state = AppState::new(config.clone(), pool.clone(), &documents, identity, image_host);

    let app = match pool {
        Some(pool) => build_router(state, PostgresStore::new(pool)),
        None => build_router(state, MemoryStore::default()),
    };
    // Sentry layers (outermost for full request coverage)
    let app = app
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("admin listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
