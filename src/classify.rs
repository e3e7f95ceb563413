//! Outcome classification.
//!
//! psql often exits 0 after SQL-level errors, so success is decided from the
//! exit status plus a fixed list of text rules over stdout and stderr:
//!
//! 1. non-zero exit status
//! 2. the connection-failure pattern matches anywhere in the combined output
//! 3. a line of the lowercased combined output starts with `error:`
//!
//! This is a heuristic and the rules are kept here, away from execution.

use crate::core::{PsqlSessionError, Result};
use crate::runner::ExecutionOutcome;
use regex::Regex;

/// psql's wording for a server it cannot reach.
pub const DEFAULT_CONNECTION_ERROR_PATTERN: &str = "could not connect to .*";

/// Why an outcome counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureRule {
    ExitStatus(i32),
    ConnectionError,
    ErrorPrefix,
}

/// Result of classifying one execution outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The query succeeded; carries stdout only.
    Success { stdout: String },
    /// The query failed; carries stdout and stderr joined by a newline.
    Failure { rule: FailureRule, combined: String },
}

impl Classification {
    pub fn is_success(&self) -> bool {
        matches!(self, Classification::Success { .. })
    }
}

/// Applies the failure rules to execution outcomes.
#[derive(Debug, Clone)]
pub struct Classifier {
    connection_error: Regex,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            connection_error: Regex::new(DEFAULT_CONNECTION_ERROR_PATTERN)
                .expect("default connection error pattern is valid"),
        }
    }
}

impl Classifier {
    /// Uses `pattern` instead of psql's default connection-failure wording.
    pub fn with_connection_error_pattern(pattern: &str) -> Result<Self> {
        let connection_error = Regex::new(pattern).map_err(|e| {
            PsqlSessionError::Config(format!("invalid connection_error_pattern: {e}"))
        })?;
        Ok(Self { connection_error })
    }

    /// Classifies an outcome. Same input, same answer.
    pub fn classify(&self, outcome: &ExecutionOutcome) -> Classification {
        let combined = format!("{}\n{}", outcome.stdout, outcome.stderr);

        let rule = if outcome.exit_status != 0 {
            Some(FailureRule::ExitStatus(outcome.exit_status))
        } else if self.connection_error.is_match(&combined) {
            Some(FailureRule::ConnectionError)
        } else if has_error_line(&combined) {
            Some(FailureRule::ErrorPrefix)
        } else {
            None
        };

        match rule {
            Some(rule) => Classification::Failure { rule, combined },
            None => Classification::Success {
                stdout: outcome.stdout.clone(),
            },
        }
    }
}

fn has_error_line(text: &str) -> bool {
    text.to_lowercase()
        .lines()
        .any(|line| line.starts_with("error:"))
}
