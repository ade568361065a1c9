//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Resilience primitives (bounded concurrency gate, circuit breaker, backoff)
//! - Cryptographic utilities (SHA-256, HMAC, Base64)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Cookie and client identification helpers
//! - Environment-driven configuration helpers

pub mod client;
pub mod config;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod resilience;
