//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions)
//! 4. `RequireAdminAuth` extractor on every `/admin` handler

pub mod auth;
pub mod session;

pub use auth::{
    AdminAuthRejection, LOGIN_PATH, RequireAdminAuth, clear_current_admin, set_current_admin,
};
pub use session::create_session_layer;
