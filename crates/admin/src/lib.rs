//! Modern Shop admin library.
//!
//! Catalog, order and store administration over the document store the
//! storefront writes to. Every `/admin` route requires a signed-in
//! account holding the admin role.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
