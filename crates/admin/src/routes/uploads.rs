//! Product image uploads.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::services::UploadError;
use crate::services::upload::{MAX_UPLOAD_BYTES, validate_upload};
use crate::state::AppState;

/// Room for multipart framing around the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Form fields accepted as the file.
const FILE_FIELDS: [&str; 2] = ["image", "file"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uploads/image", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /admin/api/uploads/image (multipart, field `image`)
#[instrument(skip(state, admin, multipart), fields(admin = %admin.email))]
async fn upload_image(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let host = state.image_host().ok_or(UploadError::NotConfigured)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if !field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;

        validate_upload(bytes.len(), &content_type)?;
        let url = host.upload(bytes.to_vec(), &filename, &content_type).await?;
        return Ok(Json(UploadResponse { url }));
    }

    Err(AppError::BadRequest("missing `image` file field".to_string()))
}
