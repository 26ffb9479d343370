use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, MusicGenError>;

/// Music generation service errors with appropriate HTTP status codes
#[derive(Debug, Error)]
pub enum MusicGenError {
    /// Invalid request parameters
    #[error("{0}")]
    InvalidRequest(String),

    /// Request body is not JSON
    #[error("Unsupported Content-Type, expected: 'Content-Type: application/json'")]
    UnsupportedMediaType,

    /// Request body exceeds the configured limit
    #[error("Request body is too large, limit is {0} bytes")]
    PayloadTooLarge(usize),

    /// Requested resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Remote generation did not produce audio
    #[error("{0}")]
    GenerationFailed(String),

    /// Remote API rejected the credential
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Remote API returned an error
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Audio store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal server error
    /// If Some(message), it is safe to show
    /// If None, details stay in the logs
    #[error("Internal server error")]
    InternalError(Option<String>),
}

impl MusicGenError {
    /// Get the appropriate HTTP status code for this error
    ///
    /// Remote-side failures (`AuthenticationFailed`, `ProviderApiError`,
    /// `ConnectionError`) only classify the provider's message; routes
    /// surface them through `GenerationFailed` or a degraded status body,
    /// so they share the generic 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::InvalidFilename(_)) => StatusCode::BAD_REQUEST,
            Self::GenerationFailed(_)
            | Self::AuthenticationFailed(_)
            | Self::ProviderApiError { .. }
            | Self::ConnectionError(_)
            | Self::ConfigError(_)
            | Self::Store(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string for the response
    pub fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_)
            | Self::UnsupportedMediaType
            | Self::PayloadTooLarge(_)
            | Self::Store(StoreError::InvalidFilename(_)) => "invalid_request_error",
            Self::NotFound(_) => "not_found_error",
            Self::GenerationFailed(_) => "generation_error",
            Self::AuthenticationFailed(_) => "authentication_error",
            Self::ConnectionError(_) | Self::ProviderApiError { .. } => "api_error",
            Self::ConfigError(_) | Self::Store(_) | Self::InternalError(_) => "internal_error",
        }
    }

    /// Message that is safe to expose to API consumers
    pub fn client_message(&self) -> String {
        match self {
            Self::InternalError(Some(message)) => message.clone(),
            Self::InternalError(None) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
}

impl IntoResponse for MusicGenError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.client_message();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "music request failed");
        }

        let error_response = ErrorResponse {
            error: ErrorDetails {
                message,
                r#type: self.error_type().to_string(),
                code: status.as_u16(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_side_failures_are_server_errors() {
        let errors = [
            MusicGenError::AuthenticationFailed("Invalid token.".to_string()),
            MusicGenError::ProviderApiError {
                status: 503,
                message: "busy".to_string(),
            },
            MusicGenError::ConnectionError("refused".to_string()),
        ];

        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{err}");
        }
    }

    #[test]
    fn generation_failure_is_server_error_with_remote_text() {
        let err = MusicGenError::GenerationFailed("CUDA out of memory".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "CUDA out of memory");
    }

    #[test]
    fn invalid_filename_is_client_error() {
        let err = MusicGenError::from(StoreError::InvalidFilename("../etc/passwd".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "invalid_request_error");
    }

    #[test]
    fn store_io_failure_exposes_message() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = MusicGenError::from(StoreError::Io(io));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.client_message().contains("permission denied"));
    }

    #[test]
    fn internal_error_without_message_stays_generic() {
        assert_eq!(MusicGenError::InternalError(None).client_message(), "Internal server error");
    }
}
