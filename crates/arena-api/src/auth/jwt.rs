//! Session token issuance and validation
//!
//! Session tokens are HS256-signed JWTs carrying the user id and an expiry
//! instant. They are self-contained: validation consults only the signing
//! secret and the token itself, never the user store.

use arena_core::config::AuthConfig;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Claims embedded in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// JWT ID - unique per token, used to correlate log lines
    pub jti: String,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
}

/// Token issuance and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,
}

/// Token signing configuration
///
/// The secret is loaded once at startup and is the sole trust anchor of the
/// token scheme.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token lifetime in seconds
    pub expiration_secs: u64,
    /// Token issuer identifier
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiration_secs: config.jwt_expiration_secs,
            issuer: config.jwt_issuer.clone(),
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_secs", &self.expiration_secs)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Issue a session token for `user_id`, expiring `expiration_secs` from now
///
/// # Example
///
/// ```no_run
/// use arena_api::auth::jwt::{issue_token, validate_token, JwtConfig};
///
/// let config = JwtConfig::default();
/// let token = issue_token(&config, 42).expect("Failed to issue token");
/// assert_eq!(validate_token(&config, &token).unwrap(), 42);
/// ```
pub fn issue_token(config: &JwtConfig, user_id: i32) -> Result<String, JwtError> {
    issue_token_at(config, user_id, Utc::now().timestamp())
}

/// Issue a session token as if the current time were `now` (Unix seconds)
pub fn issue_token_at(config: &JwtConfig, user_id: i32, now: i64) -> Result<String, JwtError> {
    let lifetime = i64::try_from(config.expiration_secs).unwrap_or(i64::MAX);
    let claims = Claims {
        iss: config.issuer.clone(),
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now.saturating_add(lifetime),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a session token and return the user id it was issued for
pub fn validate_token(config: &JwtConfig, token: &str) -> Result<i32, JwtError> {
    validate_token_at(config, token, Utc::now().timestamp())
}

/// Validate a session token as if the current time were `now` (Unix seconds)
///
/// Order matters: the signature and issuer are checked before any claim is
/// trusted, then expiry (a token is expired from the instant `exp` onwards),
/// then the subject is parsed.
pub fn validate_token_at(config: &JwtConfig, token: &str, now: i64) -> Result<i32, JwtError> {
    let claims = decode_claims(config, token)?;

    if now >= claims.exp {
        return Err(JwtError::ExpiredToken);
    }

    claims.sub.parse::<i32>().map_err(|_| JwtError::InvalidToken)
}

/// Verify signature and issuer and return the raw claims without an expiry check
pub fn decode_claims(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    // Expiry is checked by the caller against an explicit instant, without leeway
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|_| JwtError::InvalidToken)?;

    Ok(token_data.claims)
}
