//! Arena Core - configuration, shared errors and the user store
//!
//! This crate holds the pieces of the Arena authentication service that do
//! not depend on the HTTP layer:
//! - Configuration management (environment and TOML)
//! - Common error types
//! - The user store (PostgreSQL, plus an in-memory store for tests)

pub mod config;
pub mod users;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
#[cfg(feature = "test-utils")]
pub use users::MemoryUserStore;
pub use users::{PgUserStore, User, UserRepository, UserStoreError, MAX_USERNAME_LEN};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for startup and configuration
#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("User store error: {0}")]
    Store(#[from] UserStoreError),
}

pub type Result<T> = std::result::Result<T, ArenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: ArenaError = UserStoreError::ConnectRetriesExhausted {
            attempts: 3,
            last_error: "connection refused".to_string(),
        }
        .into();
        assert!(matches!(err, ArenaError::Store(_)));
        assert!(err.to_string().contains("3 attempts"));

        let err: ArenaError = ConfigError::MissingRequired("JWT_SECRET".to_string()).into();
        assert!(err.to_string().contains("JWT_SECRET"));
    }
}
