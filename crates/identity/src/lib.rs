//! Visitor Identification Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Signal bundle, feature extraction, similarity, repository traits
//! - `application/` - The identification engine and reporting use cases
//! - `infra/` - PostgreSQL repository
//! - `presentation/` - HTTP handlers, DTOs, rate-limit middleware
//!
//! ## Identification Model
//! - A hardware-only digest keys an exact-match hot cache (the fast path)
//! - On cache miss, candidates from the same /24 subnet are scored with
//!   weighted Jaccard over feature maps
//! - Scores at or above the threshold reuse the existing visitor id
//!   (self-healing); anything below creates a fresh visitor
//! - Every request is persisted in full, bot-labelled, for future matching

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use application::identify::IdentifyUseCase;
pub use error::{IdentityError, IdentityResult};
pub use infra::postgres::PgIdentityRepository;
pub use presentation::router::identity_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult, ResultExt},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
