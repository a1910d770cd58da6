//! Business logic services for storefront.
//!
//! # Services
//!
//! - `checkout` - Cart to order conversion and persistence
//! - `email` - Order notification email (SMTP)

pub mod checkout;
pub mod email;

pub use checkout::{CheckoutError, CheckoutService};
pub use email::{EmailError, EmailService, OrderNotifier};
