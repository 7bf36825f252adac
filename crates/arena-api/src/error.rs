//! API error handling
//!
//! Every failure leaves the service as a `{code, message}` body. Backend
//! detail is logged, never returned.
//!
//! Author: arena-dev@gmail.com

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Missing or malformed Authorization header
    Unauthorized(String),
    Auth(AuthError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ApiError) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ApiError::unauthorized(msg)),
            AppError::Auth(err) => {
                let message = err.to_string();
                match err {
                    AuthError::DuplicateUsername => (
                        StatusCode::CONFLICT,
                        ApiError::new("DUPLICATE_USERNAME", message),
                    ),
                    AuthError::InvalidCredentials => (
                        StatusCode::UNAUTHORIZED,
                        ApiError::new("INVALID_CREDENTIALS", message),
                    ),
                    AuthError::InvalidToken => (
                        StatusCode::UNAUTHORIZED,
                        ApiError::new("INVALID_TOKEN", message),
                    ),
                    AuthError::ExpiredToken => (
                        StatusCode::UNAUTHORIZED,
                        ApiError::new("TOKEN_EXPIRED", message),
                    ),
                    AuthError::StoreUnavailable => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        ApiError::new("SERVICE_UNAVAILABLE", "Service temporarily unavailable"),
                    ),
                    AuthError::Hashing | AuthError::TokenIssuance => {
                        (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
                    }
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_status_mapping() {
        let cases = [
            (AuthError::DuplicateUsername, StatusCode::CONFLICT),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AuthError::ExpiredToken, StatusCode::UNAUTHORIZED),
            (AuthError::StoreUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (AuthError::Hashing, StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::TokenIssuance, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_expired_and_invalid_tokens_have_distinct_codes() {
        let (_, expired) = AppError::Auth(AuthError::ExpiredToken).status_and_body();
        let (_, invalid) = AppError::Auth(AuthError::InvalidToken).status_and_body();
        assert_eq!(expired.code, "TOKEN_EXPIRED");
        assert_eq!(invalid.code, "INVALID_TOKEN");
    }

    #[test]
    fn test_api_error_serialization() {
        let json = serde_json::to_string(&ApiError::bad_request("username is required")).unwrap();
        assert!(json.contains("BAD_REQUEST"));
        assert!(json.contains("username is required"));
    }
}
