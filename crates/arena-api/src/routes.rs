//! API route definitions
//!
//! Author: arena-dev@gmail.com

use crate::auth::middleware::auth_middleware;
use crate::handlers::auth;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the `/api` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
