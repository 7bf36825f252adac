//! PostgreSQL user store
//!
//! Owns the single durable `users` record. Username uniqueness is enforced by
//! the database constraint; a duplicate insert is recognised from the driver's
//! structured constraint-violation kind, never from a prior lookup.
//!
//! Author: arena-dev@gmail.com

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::FromRow;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;

/// Longest username the `users` table accepts, in characters
pub const MAX_USERNAME_LEN: usize = 255;

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        username VARCHAR(255) UNIQUE NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

/// User store errors
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("User not found")]
    NotFound,

    #[error("User store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to connect to user store after {attempts} attempts: {last_error}")]
    ConnectRetriesExhausted { attempts: u32, last_error: String },

    #[error("Invalid user store configuration: {0}")]
    InvalidConfig(String),
}

impl From<sqlx::Error> for UserStoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => UserStoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.kind() == ErrorKind::UniqueViolation => {
                UserStoreError::DuplicateUsername
            }
            _ => UserStoreError::Unavailable(err.to_string()),
        }
    }
}

/// A stored user account
///
/// Deliberately not `Serialize`: the password hash must never leave the
/// service.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Trait for user store operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and return it with its assigned id
    ///
    /// Returns `DuplicateUsername` when the uniqueness constraint rejects the
    /// row and `Unavailable` for any other backend failure.
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, UserStoreError>;

    /// Exact, case-sensitive lookup including the password hash
    async fn find_by_username(&self, username: &str) -> Result<User, UserStoreError>;

    /// Cheap liveness check
    async fn ping(&self) -> Result<(), UserStoreError>;
}

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Connect to PostgreSQL, wait for it to come up and prepare the schema
    ///
    /// The liveness ping is retried `connect_max_retries` times with a fixed
    /// pause in between, so the database may start slightly after this
    /// process. Running out of attempts is an error the caller should treat
    /// as fatal.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, UserStoreError> {
        let options = connect_options(config)?;
        info!(
            host = %options.get_host(),
            port = options.get_port(),
            database = ?options.get_database(),
            "Initializing user store connection"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy_with(options);
        let store = Self { pool };

        let attempts = config.connect_max_retries;
        let mut last_error = String::from("no connection attempt made");
        for attempt in 1..=attempts {
            match store.ping().await {
                Ok(()) => {
                    info!(attempt, "Connected to user store");
                    store.init_schema().await?;
                    return Ok(store);
                }
                Err(e) => {
                    warn!(attempt, max_attempts = attempts, error = %e, "User store ping failed");
                    last_error = e.to_string();
                }
            }

            if attempt < attempts {
                tokio::time::sleep(config.connect_retry_interval()).await;
            }
        }

        store.pool.close().await;
        Err(UserStoreError::ConnectRetriesExhausted {
            attempts,
            last_error,
        })
    }

    /// Create the `users` table if it does not exist yet
    pub async fn init_schema(&self) -> Result<(), UserStoreError> {
        debug!("Creating user store tables if they don't exist");
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| UserStoreError::Unavailable(format!("Failed to create tables: {e}")))?;
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!("User store connection closed");
    }
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, UserStoreError> {
    match &config.host {
        Some(host) => {
            let mut options = PgConnectOptions::new().host(host);
            if let Some(port) = config.port {
                options = options.port(port);
            }
            if let Some(user) = &config.user {
                options = options.username(user);
            }
            if let Some(password) = &config.password {
                options = options.password(password);
            }
            if let Some(name) = &config.name {
                options = options.database(name);
            }
            Ok(options)
        }
        None => config
            .postgres_url
            .parse::<PgConnectOptions>()
            .map_err(|e| UserStoreError::InvalidConfig(e.to_string())),
    }
}

#[async_trait]
impl UserRepository for PgUserStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, UserStoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<User, UserStoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(UserStoreError::NotFound)?;

        Ok(user)
    }

    async fn ping(&self) -> Result<(), UserStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| UserStoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(feature = "test-utils")]
mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inner {
        next_id: i32,
        by_username: HashMap<String, User>,
    }

    /// In-memory user store for tests
    ///
    /// Insert-if-absent happens under one lock, which plays the part of the
    /// database's unique constraint.
    #[derive(Default)]
    pub struct MemoryUserStore {
        inner: Mutex<Inner>,
        unavailable: AtomicBool,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent call fail with `Unavailable`
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Number of stored users
        pub fn len(&self) -> usize {
            self.lock().map(|inner| inner.by_username.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Drop a user, as an operator deleting the account would
        pub fn remove(&self, username: &str) -> Option<User> {
            self.lock().ok()?.by_username.remove(username)
        }

        fn check_available(&self) -> Result<(), UserStoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(UserStoreError::Unavailable(
                    "connection refused".to_string(),
                ));
            }
            Ok(())
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, UserStoreError> {
            self.inner
                .lock()
                .map_err(|_| UserStoreError::Unavailable("store lock poisoned".to_string()))
        }
    }

    #[async_trait]
    impl UserRepository for MemoryUserStore {
        async fn create(
            &self,
            username: &str,
            password_hash: &str,
        ) -> Result<User, UserStoreError> {
            self.check_available()?;
            let mut inner = self.lock()?;
            if inner.by_username.contains_key(username) {
                return Err(UserStoreError::DuplicateUsername);
            }

            inner.next_id += 1;
            let user = User {
                id: inner.next_id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now(),
            };
            inner.by_username.insert(username.to_string(), user.clone());
            Ok(user)
        }

        async fn find_by_username(&self, username: &str) -> Result<User, UserStoreError> {
            self.check_available()?;
            self.lock()?
                .by_username
                .get(username)
                .cloned()
                .ok_or(UserStoreError::NotFound)
        }

        async fn ping(&self) -> Result<(), UserStoreError> {
            self.check_available()
        }
    }
}

#[cfg(feature = "test-utils")]
pub use memory::MemoryUserStore;
