//! Application state management
//!
//! Author: arena-dev@gmail.com

use crate::auth::AuthService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Authentication service over the connected user store
    pub auth: AuthService,
    /// Server start time
    pub start_time: Instant,
    /// Cleared while shutting down so readiness checks fail first
    pub is_ready: AtomicBool,
}

impl AppState {
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth,
            start_time: Instant::now(),
            is_ready: AtomicBool::new(true),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
