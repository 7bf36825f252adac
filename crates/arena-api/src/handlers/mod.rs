//! API handlers
//!
//! Author: arena-dev@gmail.com

pub mod auth;
pub mod health;
