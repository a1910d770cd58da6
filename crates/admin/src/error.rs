//! Unified error handling for admin.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use modern_shop_core::catalog::CatalogError;
use modern_shop_core::docstore::DocumentStoreError;
use modern_shop_core::order::OrderError;
use serde_json::json;
use thiserror::Error;

use crate::services::{ServiceError, UploadError};

/// Application-level error type for the admin console.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog rule violated.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Order lookup or validation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Document store operation failed.
    #[error("Document store error: {0}")]
    Documents(#[from] DocumentStoreError),

    /// Image upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Request body was not valid JSON for the endpoint.
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Catalog(e) => Self::Catalog(e),
            ServiceError::Order(e) => Self::Order(e),
            ServiceError::Documents(e) => Self::Documents(e),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Documents(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Catalog(err) => match err {
                CatalogError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::DuplicateCategory(_) | CatalogError::CategoryInUse { .. } => {
                    StatusCode::CONFLICT
                }
                CatalogError::UnknownCategory(_) | CatalogError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::Order(err) => match err {
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::LineItemUnavailable(_) => StatusCode::CONFLICT,
                OrderError::EmptyCart | OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            },
            Self::Upload(err) => match err {
                UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                UploadError::NotAnImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                UploadError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                UploadError::InvalidUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
                UploadError::Http(_) | UploadError::Api { .. } => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Documents(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Upload(err) if err.is_external() => "External service error".to_string(),
            Self::Upload(UploadError::InvalidUrl(_)) => "Internal server error".to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Upload(err) => err.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
            Self::InvalidBody(rejection) => rejection.body_text(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// JSON request body whose rejection answers through [`AppError`] (400).
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in admin.
pub fn set_sentry_user(uid: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(uid.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use modern_shop_core::ProductId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(
                CatalogError::CategoryInUse {
                    category: "Books".to_string(),
                    products: 2,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CatalogError::ProductNotFound(ProductId::new("p")).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(UploadError::NotConfigured.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(
                UploadError::Api {
                    status: 400,
                    message: "bad key".to_string(),
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(UploadError::TooLarge(3_000_000).into()),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
