//! Error taxonomy for request handlers.
//!
//! Every failure a handler can hit is one of these variants. They are logged
//! once, at the boundary, and turned into a JSON `{"error": ...}` body.
//! Messages for server-side failures stay generic; the detail goes to the log.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::model::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required field was missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The upload could not be decoded as an image.
    #[error("invalid image: {0}")]
    InvalidImage(#[from] image::ImageError),

    /// The model failed to produce a usable prediction.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The database rejected or failed an operation; any open transaction was rolled back.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Inference(_) | AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::InvalidImage(_) => "Invalid image file".to_string(),
            AppError::Inference(_) => "Failed to process image".to_string(),
            AppError::Persistence(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Error for a specific endpoint: carries the endpoint's own message for
/// server-side failures ("Failed to submit request", ...).
#[derive(Debug)]
pub struct EndpointError {
    pub source: AppError,
    pub context: &'static str,
}

impl EndpointError {
    pub fn new(context: &'static str) -> impl FnOnce(AppError) -> EndpointError {
        move |source| EndpointError { source, context }
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let status = self.source.status();
        let message = if status.is_server_error() {
            error!(error = %self.source, context = self.context, "Request failed");
            self.context.to_string()
        } else {
            warn!(error = %self.source, context = self.context, "Request rejected");
            self.source.public_message()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Inference("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Persistence(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::Inference("tensor shape [1, 3, 384, 384] rejected".into());
        assert_eq!(err.public_message(), "Failed to process image");

        let err = EndpointError {
            source: AppError::Persistence(sqlx::Error::PoolTimedOut),
            context: "Failed to submit request",
        };
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_client_errors_keep_message() {
        let err = AppError::Validation("Name and phone are required".into());
        assert_eq!(err.public_message(), "Name and phone are required");
    }
}
