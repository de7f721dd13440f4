//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic digests (SHA-256)
//! - Client IP extraction and anonymization
//! - Hot cache abstraction (visitor lookups, rate limits, metrics)
//! - Rate limiting configuration
//! - Retry with exponential backoff

pub mod cache;
pub mod client;
pub mod crypto;
pub mod rate_limit;
pub mod retry;
