//! Centralized error handling for the M3U importer
//!
//! # Error Categories
//!
//! - **Fetch Errors**: playlist URL retrieval (network, non-2xx, size cap)
//! - **Read Errors**: local or uploaded file access and UTF-8 decoding
//! - **Import Errors**: per-record submission failures
//! - **Session Errors**: transitions not valid in the current session state
//!
//! A playlist that parses to zero records is not an error; it is reported
//! through the parse summary.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for session transitions
pub type SessionResult<T> = Result<T, SessionError>;
