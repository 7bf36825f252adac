//! Authentication module
//!
//! - Password hashing with Argon2id
//! - Session token issuance and validation (HS256 JWT)
//! - The authentication service tying both to the user store
//! - Middleware for request authentication

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{issue_token, validate_token, Claims, JwtConfig, JwtError};
pub use middleware::{auth_middleware, bearer_token, AuthenticatedUser};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::{AuthError, AuthService, AuthSession};
