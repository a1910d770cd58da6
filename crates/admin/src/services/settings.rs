//! Store settings document.

use modern_shop_core::docstore::{Collection, SharedDocumentStore};
use modern_shop_core::settings::{SETTINGS_COLLECTION, STORE_SETTINGS_ID, StoreSettings};

use super::ServiceError;

/// Reads and writes `settings/store`.
pub struct SettingsService {
    settings: Collection<StoreSettings>,
}

impl SettingsService {
    #[must_use]
    pub const fn new(documents: SharedDocumentStore) -> Self {
        Self {
            settings: Collection::new(documents, SETTINGS_COLLECTION),
        }
    }

    /// Current settings; defaults when never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored document is unreadable.
    pub async fn get(&self) -> Result<StoreSettings, ServiceError> {
        Ok(self
            .settings
            .get(STORE_SETTINGS_ID)
            .await?
            .unwrap_or_default())
    }

    /// Replace the settings document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store fails.
    pub async fn save(&self, settings: &StoreSettings) -> Result<(), ServiceError> {
        self.settings.set(STORE_SETTINGS_ID, settings).await?;
        tracing::info!(
            notifications = settings.store_email.is_some(),
            "Store settings saved"
        );
        Ok(())
    }
}
