//! Product image uploads to an external image host.
//!
//! # API Reference
//!
//! - Endpoint: `https://api.imgbb.com/1/upload?key=<key>`
//! - Body: multipart form with the file in the `image` field
//! - Response: `{"success": true, "data": {"url": ..., "display_url": ...}}`

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::ImageHostConfig;

/// Largest accepted upload (2 MiB).
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Errors that can occur when uploading an image.
#[derive(Debug, Error)]
pub enum UploadError {
    /// File exceeds [`MAX_UPLOAD_BYTES`].
    #[error("image must be smaller than 2 MB (got {0} bytes)")]
    TooLarge(usize),

    /// Not an `image/*` content type.
    #[error("only image files can be uploaded (got {0})")]
    NotAnImage(String),

    /// No image host configured.
    #[error("image uploads are not configured")]
    NotConfigured,

    /// Upload endpoint is not a valid URL.
    #[error("invalid upload URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host rejected the upload.
    #[error("image host error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl UploadError {
    /// Whether the error comes from the remote host rather than the input.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. })
    }
}

/// Check size and content type before anything leaves the process.
///
/// # Errors
///
/// Returns `TooLarge` or `NotAnImage`.
pub fn validate_upload(len: usize, content_type: &str) -> Result<(), UploadError> {
    if len > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge(len));
    }
    if !content_type.starts_with("image/") {
        return Err(UploadError::NotAnImage(content_type.to_string()));
    }
    Ok(())
}

/// Somewhere to put product images.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload the file and return its public URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, UploadError>;
}

#[derive(Debug, Deserialize)]
struct ImgbbResponse {
    success: bool,
    #[serde(default)]
    data: Option<ImgbbImage>,
    #[serde(default)]
    error: Option<ImgbbErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ImgbbImage {
    url: String,
    #[serde(default)]
    display_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImgbbErrorBody {
    message: String,
}

/// `ImgBB` client.
#[derive(Clone)]
pub struct ImgbbClient {
    client: reqwest::Client,
    api_key: SecretString,
    upload_url: String,
}

impl ImgbbClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ImageHostConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            upload_url: config.upload_url.clone(),
        })
    }
}

impl std::fmt::Debug for ImgbbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgbbClient")
            .field("upload_url", &self.upload_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ImageHost for ImgbbClient {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, UploadError> {
        validate_upload(bytes.len(), content_type)?;

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("image", part);

        let url = Url::parse_with_params(&self.upload_url, &[("key", self.api_key.expose_secret())])?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: ImgbbResponse = response.json().await?;
        match body {
            ImgbbResponse {
                success: true,
                data: Some(image),
                ..
            } => {
                tracing::info!(filename, "Image uploaded");
                Ok(image.display_url.unwrap_or(image.url))
            }
            ImgbbResponse { error, .. } => Err(UploadError::Api {
                status,
                message: error.map_or_else(|| "upload failed".to_string(), |e| e.message),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload(1024, "image/png").is_ok());
        assert!(validate_upload(MAX_UPLOAD_BYTES, "image/jpeg").is_ok());
        assert!(matches!(
            validate_upload(MAX_UPLOAD_BYTES + 1, "image/png"),
            Err(UploadError::TooLarge(_))
        ));
        assert!(matches!(
            validate_upload(10, "application/pdf"),
            Err(UploadError::NotAnImage(_))
        ));
    }

    #[test]
    fn test_imgbb_response_parsing() {
        let ok: ImgbbResponse = serde_json::from_str(
            r#"{"success": true, "status": 200, "data": {"url": "https://i.ibb.co/a.png", "display_url": "https://i.ibb.co/d.png"}}"#,
        )
        .unwrap();
        assert!(ok.success);

        let err: ImgbbResponse = serde_json::from_str(
            r#"{"success": false, "status": 400, "error": {"message": "Invalid API v1 key."}}"#,
        )
        .unwrap();
        assert_eq!(err.error.map(|e| e.message).as_deref(), Some("Invalid API v1 key."));
    }
}
