//! Password hashing and verification using Argon2id
//!
//! Implements salted password hashing following OWASP recommendations:
//! - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
//! - Memory: 64 MB
//! - Iterations: 3
//! - Parallelism: 4 lanes
//! - Salt: 16 bytes random
//! - Output: 32 bytes hash
//!
//! Verification parses the parameters back out of the stored PHC string, so
//! hashes written with older cost settings keep verifying after a config
//! change.

use arena_core::config::AuthConfig;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
}

/// Password hashing configuration
///
/// These parameters are tuned for security while maintaining acceptable performance.
/// Increasing memory or iterations improves security but slows down hashing.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (lanes, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl From<&AuthConfig> for PasswordConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            memory_cost: config.password_memory_cost,
            time_cost: config.password_time_cost,
            parallelism: config.password_parallelism,
            ..Self::default()
        }
    }
}

impl PasswordConfig {
    /// Cheap parameters for tests; never use in production
    pub fn insecure_fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    /// Create Argon2 parameters from this configuration
    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash a plaintext password using Argon2id
///
/// # Returns
///
/// * `Ok(String)` - PHC string format hash (includes algorithm, parameters, salt, and hash)
/// * `Err(PasswordError)` - If the parameters are invalid or the salt cannot be generated
///
/// # Example
///
/// ```no_run
/// use arena_api::auth::password::{hash_password, PasswordConfig};
///
/// let hash = hash_password("s3cr3t!", &PasswordConfig::default()).expect("Failed to hash password");
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = config.to_params()?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// Returns `false` for a wrong password and for a stored hash that cannot be
/// parsed; callers cannot tell the two apart. The final digest comparison is
/// constant-time.
///
/// # Example
///
/// ```no_run
/// use arena_api::auth::password::{hash_password, verify_password, PasswordConfig};
///
/// let hash = hash_password("s3cr3t!", &PasswordConfig::default()).unwrap();
/// assert!(verify_password("s3cr3t!", &hash));
/// assert!(!verify_password("wrong", &hash));
/// ```
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
