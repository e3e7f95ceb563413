/// Core Module for psql-session
///
/// Shared infrastructure used by every other module: the error type and its
/// result alias.

pub mod error;

// Re-export commonly used types for convenience
pub use error::{PsqlSessionError, Result};
