//! Modern Shop Core - Shared domain library.
//!
//! This crate provides the domain model used by every Modern Shop component:
//! - `storefront` - Public-facing shop (catalog, cart, checkout)
//! - `admin` - Administration console (products, orders, analytics)
//! - `cli` - Command-line tools for migrations, seeding and exports
//!
//! # Architecture
//!
//! Everything here is synchronous, pure domain logic except for
//! [`docstore`], which defines the document store seam and its in-memory
//! implementation. The `PostgreSQL` backend is behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails and statuses
//! - [`catalog`] - Products, categories and catalog queries
//! - [`cart`] - Shopping cart lines and totals
//! - [`order`] - Orders, checkout conversion and order queries
//! - [`analytics`] - Dashboard metrics and reports
//! - [`export`] - Spreadsheet (CSV) export
//! - [`identity`] - User and role records
//! - [`settings`] - Store settings document
//! - [`docstore`] - Document store abstraction

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod docstore;
pub mod export;
pub mod identity;
pub mod order;
pub mod settings;
pub mod types;

pub use types::*;
