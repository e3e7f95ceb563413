// Core infrastructure modules
pub mod core;
pub mod config;

// Command construction, execution and classification
pub mod classify;
pub mod command;
pub mod lines;
pub mod runner;
pub mod session;

pub mod test_utils;

pub use classify::{Classification, Classifier, FailureRule};
pub use command::{build_command, redact_command, shell_escape, REDACT_PATTERN};
pub use config::ConnectionParams;
pub use crate::core::{PsqlSessionError, Result};
pub use lines::QueryResult;
pub use runner::{CommandRunner, ExecutionOutcome, ShellRunner};
pub use session::{QuerySession, SessionState, PROBE_QUERY};
