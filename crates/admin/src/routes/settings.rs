//! Store settings.

use axum::{Json, Router, extract::State, routing::get};
use modern_shop_core::Email;
use modern_shop_core::settings::StoreSettings;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(show).put(update))
}

/// Body of `PUT /settings`. An empty email turns notifications off.
#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub store_email: Option<String>,
}

impl SettingsForm {
    fn validate(self) -> Result<StoreSettings> {
        let store_email = match self.store_email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                Email::parse(raw)
                    .map_err(|e| AppError::BadRequest(format!("store_email: {e}")))?,
            ),
        };
        Ok(StoreSettings {
            store_name: self.store_name.trim().to_string(),
            store_email,
        })
    }
}

/// GET /admin/api/settings
async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<StoreSettings>> {
    Ok(Json(state.settings().get().await?))
}

/// PUT /admin/api/settings
#[instrument(skip(state, admin, form), fields(admin = %admin.email))]
async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    ApiJson(form): ApiJson<SettingsForm>,
) -> Result<Json<StoreSettings>> {
    let settings = form.validate()?;
    state.settings().save(&settings).await?;
    Ok(Json(settings))
}
