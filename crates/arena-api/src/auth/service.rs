//! Authentication service layer
//!
//! Orchestrates the user store, password hasher and token codec for the two
//! credential flows (register, login) and exposes token verification to every
//! protected endpoint.
//!
//! Both flows are single pass: a failure at any step ends the flow and is
//! never retried here, since repeating a password or token step against a
//! store that may already have changed is not safe.

use super::jwt::{issue_token, validate_token, JwtConfig, JwtError};
use super::password::{hash_password, verify_password, PasswordConfig};
use arena_core::config::AuthConfig;
use arena_core::users::{UserRepository, UserStoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

/// Hashed once per service and verified against when a username is unknown,
/// so both login failure paths do the same amount of work.
const DUMMY_PASSWORD: &str = "arena-dummy-password-for-timing";

/// Externally visible authentication outcomes
///
/// Carries no backend detail; the underlying cause is logged where the
/// error is classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Failed to process password")]
    Hashing,

    #[error("User store unavailable")]
    StoreUnavailable,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Failed to issue token")]
    TokenIssuance,
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::ExpiredToken => AuthError::ExpiredToken,
            JwtError::InvalidToken => AuthError::InvalidToken,
            JwtError::Encoding(e) => {
                error!(error = %e, "Token encoding failed");
                AuthError::TokenIssuance
            }
        }
    }
}

/// Result of a successful register or login
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: i32,
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    /// Create a new authentication service over an already connected store
    pub fn new(
        users: Arc<dyn UserRepository>,
        jwt_config: JwtConfig,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            users,
            jwt_config,
            password_config,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Build token and hasher settings from the application config
    pub fn from_config(users: Arc<dyn UserRepository>, config: &AuthConfig) -> Self {
        Self::new(users, JwtConfig::from(config), PasswordConfig::from(config))
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.users
    }

    /// Register a new user and issue their first session token
    ///
    /// hash-password → create-user → issue-token. A failed hash never reaches
    /// the store and a rejected insert never reaches token issuance.
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthSession, AuthError> {
        let password_hash = self.hash(password).await?;

        let user = self
            .users
            .create(username, &password_hash)
            .await
            .map_err(|e| match e {
                UserStoreError::DuplicateUsername => {
                    debug!(username = %username, "Registration rejected: username taken");
                    AuthError::DuplicateUsername
                }
                other => {
                    error!(error = %other, "User store failed during registration");
                    AuthError::StoreUnavailable
                }
            })?;

        self.session_for(user.id)
    }

    /// Verify credentials and issue a session token
    ///
    /// An unknown username and a wrong password both yield
    /// `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = match self.users.find_by_username(username).await {
            Ok(user) => user,
            Err(UserStoreError::NotFound) => {
                self.burn_verification(password).await;
                return Err(AuthError::InvalidCredentials);
            }
            Err(other) => {
                error!(error = %other, "User store failed during login");
                return Err(AuthError::StoreUnavailable);
            }
        };

        if !self.verify(password, &user.password_hash).await {
            return Err(AuthError::InvalidCredentials);
        }

        self.session_for(user.id)
    }

    /// Resolve a bearer token to the user id it was issued for
    ///
    /// Stateless: the store is not consulted, so the token of a user deleted
    /// after issuance keeps authenticating until it expires.
    pub fn authenticate(&self, token: &str) -> Result<i32, AuthError> {
        Ok(validate_token(&self.jwt_config, token)?)
    }

    fn session_for(&self, user_id: i32) -> Result<AuthSession, AuthError> {
        let token = issue_token(&self.jwt_config, user_id)?;
        Ok(AuthSession {
            user_id,
            token,
            expires_in: self.jwt_config.expiration_secs,
        })
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let config = self.password_config.clone();

        tokio::task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .map_err(|e| {
                error!(error = %e, "Password hashing task failed");
                AuthError::Hashing
            })?
            .map_err(|e| {
                error!(error = %e, "Password hashing failed");
                AuthError::Hashing
            })
    }

    async fn verify(&self, password: &str, hash: &str) -> bool {
        let password = password.to_owned();
        let hash = hash.to_owned();

        match tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await {
            Ok(matched) => matched,
            Err(e) => {
                error!(error = %e, "Password verification task failed");
                false
            }
        }
    }

    async fn burn_verification(&self, password: &str) {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD))
            .await;

        match dummy {
            Ok(hash) => {
                self.verify(password, hash).await;
            }
            Err(_) => warn!("Dummy hash unavailable; unknown-user login returned early"),
        }
    }
}
