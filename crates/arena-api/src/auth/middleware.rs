//! Authentication middleware for protecting routes
//!
//! Extracts the bearer token from the Authorization header and resolves it
//! through the `AuthService` held in application state. On success the
//! authenticated user is added to request extensions.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authenticated user extracted from a session token
///
/// Added to request extensions by the auth middleware and extracted in
/// handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i32,
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware that requires a valid session token
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use arena_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header format".to_string()))?;

    let token = bearer_token(auth_header).ok_or_else(|| {
        AppError::Unauthorized("Invalid Authorization header format".to_string())
    })?;

    let user_id = match state.auth.authenticate(token) {
        Ok(id) => id,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: e.to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            return Err(e.into());
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}
