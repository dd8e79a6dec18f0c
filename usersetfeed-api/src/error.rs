/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>` which automatically
/// converts to appropriate HTTP status codes.
///
/// Structured `userset_create` validation failures are not errors here: they
/// travel in a 200 response body with a negative `messagecode`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use usersetfeed_shared::store::StoreError;
use usersetfeed_shared::userset::error::UsersetError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "forbidden")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::InternalError(format!("Store error: {}", err))
    }
}

/// Convert user set flow errors to API errors
impl From<UsersetError> for ApiError {
    fn from(err: UsersetError) -> Self {
        match err {
            UsersetError::InvalidParameter(_) | UsersetError::InvalidParent(_) => {
                ApiError::BadRequest(err.to_string())
            }
            UsersetError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            UsersetError::HostDependencyMissing => ApiError::ServiceUnavailable(err.to_string()),
            // Reported in the response body by the flow itself
            UsersetError::Validation(failure) => ApiError::BadRequest(failure.message),
            UsersetError::CreateFailed(_) => ApiError::InternalError(err.to_string()),
            UsersetError::Store(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usersetfeed_shared::userset::error::MessageCode;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::Forbidden("No".to_string());
        assert_eq!(err.to_string(), "Forbidden: No");
    }

    #[test]
    fn test_userset_error_status_codes() {
        let status = |err: UsersetError| ApiError::from(err).into_response().status();

        assert_eq!(
            status(UsersetError::InvalidParameter("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(UsersetError::InvalidParent("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(UsersetError::Forbidden("x".to_string())), StatusCode::FORBIDDEN);
        assert_eq!(
            status(UsersetError::HostDependencyMissing),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(UsersetError::CreateFailed("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(UsersetError::Store(StoreError::Unavailable("down".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(MessageCode::EmptyValue.into()),
            StatusCode::BAD_REQUEST
        );
    }
}
