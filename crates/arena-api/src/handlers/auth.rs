//! Authentication API handlers
//!
//! Register and login exchange a username and password for a session token.
//! `/api/me` resolves a token back to the user it was issued for.
//!
//! Author: arena-dev@gmail.com

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{AuthSession, AuthenticatedUser};
use crate::error::AppError;
use crate::state::AppState;
use arena_core::MAX_USERNAME_LEN;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued session token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: i32,
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user_id: session.user_id,
            token: session.token,
            token_type: "Bearer".to_string(),
            expires_in: session.expires_in,
        }
    }
}

/// Current user response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user_id: i32,
}

fn validate_credentials(username: &str, password: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::BadRequest("username is required".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::BadRequest("password is required".to_string()));
    }
    // PostgreSQL text cannot hold NUL
    if username.contains('\0') {
        return Err(AppError::BadRequest(
            "username must not contain NUL characters".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::BadRequest(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Register a new user account
///
/// # Responses
///
/// * `201 Created` - User registered, returns a session token
/// * `400 Bad Request` - Empty or oversized field
/// * `409 Conflict` - Username already exists
/// * `500 Internal Server Error` - Password could not be processed
/// * `503 Service Unavailable` - User store unreachable
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Username already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
        (status = 503, description = "User store unavailable", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_credentials(&request.username, &request.password)?;

    match state.auth.register(&request.username, &request.password).await {
        Ok(session) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                user_id: session.user_id,
                username: request.username,
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
        }
        Err(e) => {
            audit_log(&AuditEvent::RegistrationFailure {
                username: request.username,
                reason: e.to_string(),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(e.into())
        }
    }
}

/// Login with username and password
///
/// An unknown username and a wrong password produce the same response.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 503, description = "User store unavailable", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_credentials(&request.username, &request.password)?;

    let result = state.auth.login(&request.username, &request.password).await;
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    match result {
        Ok(session) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: session.user_id,
                username: request.username,
                ip_address,
                user_agent,
            });
            Ok(Json(AuthResponse::from(session)))
        }
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                username: request.username,
                reason: e.to_string(),
                ip_address,
                user_agent,
            });
            Err(AppError::from(e))
        }
    }
}

/// Get the user the presented token was issued for
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated user", body = MeResponse),
        (status = 401, description = "Missing, invalid or expired token", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> impl IntoResponse {
    Json(MeResponse {
        user_id: user.user_id,
    })
}
