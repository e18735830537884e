//! Shared primitives for all Rust crates in Ledgerline.

#![forbid(unsafe_code)]

/// Per-request actor and correlation context.
pub mod context;

use thiserror::Error;

pub use context::{ActorRole, RequestContext};

/// Result type used across Ledgerline crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Pagination token could not be decoded.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
