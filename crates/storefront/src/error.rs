//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;

/// Body sent for every failure that has no more specific message.
pub const GENERIC_MESSAGE: &str = "Something went wrong...";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found. Answered with an empty body.
    #[error("Not found")]
    NotFound,

    /// A resolver middleware did not attach the entity a handler needs.
    #[error("{0}")]
    MissingContext(&'static str),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A failure with a message written for the buyer, usually pointing
    /// them at the support address. The handler logs the underlying cause.
    #[error("{message}")]
    Support { status: StatusCode, message: String },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A buyer-facing failure with the given status and message.
    pub fn support(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Support {
            status,
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::MissingContext(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Support { status, .. } => *status,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry. Support errors are reported by
        // the handler that builds them, together with their cause.
        if status.is_server_error() && !matches!(self, Self::Support { .. }) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::BadRequest(_)) {
            tracing::warn!(error = %self, "Rejected request");
        }

        // Don't expose internal error details to clients
        let message = match self {
            Self::NotFound => String::new(),
            Self::MissingContext(message) => message.to_owned(),
            Self::Support { message, .. } => message,
            Self::Database(_) | Self::BadRequest(_) | Self::Internal(_) => {
                GENERIC_MESSAGE.to_owned()
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("missing email".to_string());
        assert_eq!(err.to_string(), "Bad request: missing email");

        let err = AppError::MissingContext("Campaign not provided");
        assert_eq!(err.to_string(), "Campaign not provided");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_of(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, GENERIC_MESSAGE);

        let (status, body) =
            body_of(AppError::Database(RepositoryError::Conflict("dup".to_string()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, GENERIC_MESSAGE);
    }

    #[tokio::test]
    async fn test_app_error_status_codes() {
        assert_eq!(body_of(AppError::NotFound).await, (StatusCode::NOT_FOUND, String::new()));
        assert_eq!(
            body_of(AppError::BadRequest("x".to_string())).await,
            (StatusCode::BAD_REQUEST, GENERIC_MESSAGE.to_string())
        );
        assert_eq!(
            body_of(AppError::MissingContext("Order not provided")).await,
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Order not provided".to_string()
            )
        );
        assert_eq!(
            body_of(AppError::support(StatusCode::OK, "Your card was declined.")).await,
            (StatusCode::OK, "Your card was declined.".to_string())
        );
    }
}
