//! psql command construction.
//!
//! Builds the single shell command line a session hands to its runner, and
//! supplies the pattern used to mask the password before that line is logged.

use crate::config::ConnectionParams;
use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern matching a composed psql command line. Group 1 ends right before
/// the password, group 2 starts right after it. The password may span lines.
pub const REDACT_PATTERN: &str = r"(PGPASSWORD=')(?s:.+)(' psql .*)";

/// Replacement text for the password segment.
pub const REDACTED: &str = "REDACTED";

static REDACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(REDACT_PATTERN).expect("redaction pattern is valid"));

/// Escapes a string so a POSIX shell reads it back as exactly one word.
///
/// Every character outside `[A-Za-z0-9_\-.,:+/@\n]` gets a leading backslash,
/// newlines are wrapped in single quotes and the empty string becomes `''`.
pub fn shell_escape(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }

    let mut escaped = String::with_capacity(word.len() * 2);
    for c in word.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-' | '.' | ',' | ':' | '+' | '/' | '@' => {
                escaped.push(c)
            }
            '\n' => escaped.push_str("'\n'"),
            _ => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }
    escaped
}

/// Quotes a value for use inside `'...'`, closing and reopening the quotes
/// around any embedded single quote.
fn single_quote_body(value: &str) -> String {
    value.replace('\'', r"'\''")
}

/// Composes the psql invocation for `query` against `databases`.
///
/// Database names are inserted verbatim; callers that accept names from
/// untrusted input must check them first (see
/// [`is_safe_database_name`]).
pub fn build_command<S: AsRef<str>>(
    params: &ConnectionParams,
    query: &str,
    databases: &[S],
) -> String {
    let mut parts = vec![
        format!("PGPASSWORD='{}'", single_quote_body(params.password())),
        "psql".to_string(),
        "-U".to_string(),
        params.user().to_string(),
    ];
    for db in databases {
        parts.push("-d".to_string());
        parts.push(db.as_ref().to_string());
    }
    parts.extend([
        "-h".to_string(),
        params.host().to_string(),
        "-p".to_string(),
        params.port().to_string(),
        "-A".to_string(),
        "-t".to_string(),
        "-c".to_string(),
        shell_escape(query),
    ]);
    parts.join(" ")
}

/// Masks the password in a composed command line.
///
/// Text that does not look like a psql command line is returned unchanged.
pub fn redact_command(command: &str) -> String {
    REDACT_RE
        .replace(command, format!("${{1}}{REDACTED}${{2}}").as_str())
        .into_owned()
}

/// True when `name` can be placed on the command line without quoting.
pub fn is_safe_database_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
