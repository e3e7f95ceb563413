/// psql-session Error Module
///
/// This module defines the error types returned by sessions, the command
/// runner and configuration loading.
use thiserror::Error;

/// Error type for psql-session.
///
/// The first three variants are the failure kinds a calling assertion has to
/// treat as fatal:
/// - Missing credentials at construction
/// - A failed probe query, surfaced on every later query
/// - A query whose output was classified as a failure
#[derive(Error, Debug)]
pub enum PsqlSessionError {
    /// User or password missing; no process was spawned
    #[error("Can't run PostgreSQL SQL checks without authentication.")]
    Configuration(String),

    /// The probe query failed when the session was created
    #[error("PostgreSQL connection failed: {0}")]
    ConnectionFailure(String),

    /// Non-zero exit status or error text in the psql output
    #[error("PostgreSQL query with errors: {0}")]
    Execution(String),

    /// Database name that is not a plain shell word
    #[error("Invalid database name: {0:?}")]
    InvalidDatabaseName(String),

    /// Configuration file contents that cannot be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure to spawn or wait on the psql process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PsqlSessionError {
    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) | Self::Config(_) | Self::Toml(_) => "Configuration Error",
            Self::ConnectionFailure(_) => "Connection Failure",
            Self::Execution(_) | Self::Io(_) => "Execution Failure",
            Self::InvalidDatabaseName(_) => "Invalid Input",
        }
    }

    /// Raw psql output or failure reason carried by the error, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailure(out) | Self::Execution(out) => Some(out),
            _ => None,
        }
    }
}

/// Type alias for Result to use PsqlSessionError as the error type.
pub type Result<T> = std::result::Result<T, PsqlSessionError>;
