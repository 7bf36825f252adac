//! Security audit logging for authentication events
//!
//! Registrations, logins and rejected tokens are logged on the "audit"
//! target so they can be filtered and routed separately from application
//! logs (`RUST_LOG=audit=info`). Passwords, hashes and tokens never appear in
//! an event.
//!
//! Author: arena-dev@gmail.com

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Security audit events for authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful user registration
    RegistrationSuccess {
        user_id: i32,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful user login
    LoginSuccess {
        user_id: i32,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Invalid or expired token presented to a protected endpoint
    InvalidToken {
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },
}

/// Log a security audit event with structured fields
///
/// The whole event is also attached as JSON for log aggregators:
///
/// ```json
/// {
///   "event_type": "login_success",
///   "user_id": 1,
///   "username": "alice",
///   "ip_address": "192.168.1.1",
///   "user_agent": "Mozilla/5.0..."
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::RegistrationSuccess {
            user_id,
            username,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                ip_address = ?ip_address,
                "Registration successful"
            );
        }
        AuditEvent::RegistrationFailure {
            username,
            reason,
            ip_address,
            ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                reason = %reason,
                ip_address = ?ip_address,
                "Registration failed"
            );
        }
        AuditEvent::LoginSuccess {
            user_id,
            username,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            username,
            reason,
            ip_address,
            ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                reason = %reason,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::InvalidToken {
            reason, ip_address, ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                ip_address = ?ip_address,
                "Invalid token"
            );
        }
    }
}

/// Extract the client IP address from proxy headers
///
/// Checks X-Forwarded-For (first hop), then X-Real-IP.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
