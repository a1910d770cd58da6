//! Shop-wide settings stored as a single document.

use serde::{Deserialize, Serialize};

use crate::types::Email;

/// Collection holding settings documents.
pub const SETTINGS_COLLECTION: &str = "settings";

/// Id of the store settings document.
pub const STORE_SETTINGS_ID: &str = "store";

/// Store name and contact address.
///
/// `store_email` receives new-order notifications; without it checkout
/// sends nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub store_email: Option<Email>,
}
