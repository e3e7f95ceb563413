use std::fmt;

/// Output of a successful query, ready for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    output: String,
    description: String,
}

impl QueryResult {
    /// Wraps raw stdout for `query`; surrounding whitespace is trimmed.
    pub fn new(stdout: &str, query: &str) -> Self {
        QueryResult {
            output: stdout.trim().to_string(),
            description: format!("PostgreSQL query: {query}"),
        }
    }

    /// Trimmed stdout.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// One entry per output row. Empty output has no rows.
    pub fn lines(&self) -> Vec<&str> {
        if self.output.is_empty() {
            return Vec::new();
        }
        self.output.split('\n').collect()
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
