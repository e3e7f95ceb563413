/// Query Session Module
///
/// A `QuerySession` checks its credentials once with a probe query when it
/// is created, then runs any number of independent queries through psql.
/// If the probe fails the session stays failed and refuses every query
/// without spawning a process.

use crate::classify::{Classification, Classifier};
use crate::command::{build_command, is_safe_database_name, redact_command};
use crate::config::ConnectionParams;
use crate::core::{PsqlSessionError, Result};
use crate::lines::QueryResult;
use crate::runner::{CommandRunner, ShellRunner};
use tracing::{debug, info, warn};

/// Cheap metadata listing used to validate connectivity and credentials.
pub const PROBE_QUERY: &str = r"\du";

/// Session state, fixed once the probe query has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    /// The probe failed; carries the failure reason
    Failed(String),
}

/// Runs queries against one PostgreSQL server through psql.
#[derive(Debug)]
pub struct QuerySession<R: CommandRunner = ShellRunner> {
    params: ConnectionParams,
    runner: R,
    classifier: Classifier,
    state: SessionState,
}

impl QuerySession<ShellRunner> {
    /// Creates a session that runs psql through `sh`.
    ///
    /// Missing user, host and port fall back to `postgres`, `localhost` and
    /// `5432`.
    ///
    /// # Errors
    ///
    /// `PsqlSessionError::Configuration` if the user or password is empty.
    /// A failed probe does not error here; see [`QuerySession::state`].
    pub fn new(
        user: Option<&str>,
        password: &str,
        host: Option<&str>,
        port: Option<u16>,
    ) -> Result<Self> {
        let params = ConnectionParams::new(user, password, host, port)?;
        Self::connect(params, ShellRunner::new())
    }
}

impl<R: CommandRunner> QuerySession<R> {
    /// Creates a session on `runner` with the default classifier.
    pub fn connect(params: ConnectionParams, runner: R) -> Result<Self> {
        Self::connect_with(params, runner, Classifier::default())
    }

    /// Creates a session on `runner` and runs the probe query.
    ///
    /// `params` were checked by [`ConnectionParams::new`]; a failed probe is
    /// recorded in the session state rather than returned.
    pub fn connect_with(params: ConnectionParams, runner: R, classifier: Classifier) -> Result<Self> {
        let mut session = QuerySession {
            params,
            runner,
            classifier,
            state: SessionState::Ready,
        };

        match session.execute::<&str>(PROBE_QUERY, &[]) {
            Ok(_) => {
                info!(
                    user = session.params.user(),
                    host = session.params.host(),
                    port = session.params.port(),
                    "PostgreSQL session ready"
                );
            }
            Err(e) => {
                let reason = e.output().map(str::to_string).unwrap_or_else(|| e.to_string());
                warn!(
                    host = session.params.host(),
                    port = session.params.port(),
                    "PostgreSQL probe query failed: {}",
                    reason.trim()
                );
                session.state = SessionState::Failed(reason);
            }
        }

        Ok(session)
    }

    /// Runs `query` against `databases` (psql's default database when empty).
    ///
    /// # Errors
    ///
    /// - `ConnectionFailure` if the probe failed; nothing is spawned
    /// - `InvalidDatabaseName` for a name that is not a plain shell word
    /// - `Execution` if the output classifies as a failure
    /// - `Io` if the process could not be run
    pub fn query<S: AsRef<str>>(&self, query: &str, databases: &[S]) -> Result<QueryResult> {
        if let SessionState::Failed(reason) = &self.state {
            return Err(PsqlSessionError::ConnectionFailure(reason.clone()));
        }

        if let Some(bad) = databases.iter().find(|db| !is_safe_database_name(db.as_ref())) {
            return Err(PsqlSessionError::InvalidDatabaseName(bad.as_ref().to_string()));
        }

        self.execute(query, databases)
    }

    fn execute<S: AsRef<str>>(&self, query: &str, databases: &[S]) -> Result<QueryResult> {
        let command = build_command(&self.params, query, databases);
        debug!(command = %redact_command(&command), "running psql");

        let outcome = self.runner.run(&command)?;

        match self.classifier.classify(&outcome) {
            Classification::Success { stdout } => Ok(QueryResult::new(&stdout, query)),
            Classification::Failure { rule, combined } => {
                warn!(?rule, "psql output classified as failure");
                Err(PsqlSessionError::Execution(combined))
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Reason recorded by a failed probe.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(reason) => Some(reason),
            SessionState::Ready => None,
        }
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ExecutionOutcome;
    use crate::test_utils::ScriptedRunner;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing::Level;

    fn params() -> ConnectionParams {
        ConnectionParams::new(None, "secret", None, None).unwrap()
    }

    #[test]
    fn test_probe_runs_du() {
        let runner = ScriptedRunner::new().with_outcome(ExecutionOutcome::new(0, "postgres|Superuser", ""));
        let session = QuerySession::connect(params(), &runner).unwrap();

        assert!(session.is_ready());
        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].ends_with(r"-c \\du"));
    }

    #[test]
    fn test_failed_probe_is_recorded_not_raised() {
        let runner = ScriptedRunner::new().with_outcome(ExecutionOutcome::new(
            2,
            "",
            "psql: could not connect to server: Connection refused",
        ));
        let session = QuerySession::connect(params(), &runner).unwrap();

        assert!(!session.is_ready());
        assert!(session
            .failure_reason()
            .unwrap()
            .contains("could not connect to server"));
    }

    #[test]
    fn test_failed_session_does_not_spawn() {
        let runner = ScriptedRunner::new().with_outcome(ExecutionOutcome::new(2, "", "could not connect to server"));
        let session = QuerySession::connect(params(), &runner).unwrap();

        for _ in 0..3 {
            let err = session.query::<&str>("SELECT 1;", &[]).unwrap_err();
            assert!(matches!(err, PsqlSessionError::ConnectionFailure(_)));
        }
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn test_probe_spawn_error_fails_session() {
        let runner = ScriptedRunner::new().with_spawn_error("sh: not found");
        let session = QuerySession::connect(params(), &runner).unwrap();
        assert!(session.failure_reason().unwrap().contains("sh: not found"));
    }

    #[test]
    fn test_session_keeps_validated_params() {
        let runner = ScriptedRunner::new().with_outcome(ExecutionOutcome::default());
        let p = ConnectionParams::new(Some("auditor"), "secret", Some("db.internal"), Some(6432)).unwrap();
        let session = QuerySession::connect(p.clone(), &runner).unwrap();
        assert_eq!(session.params(), &p);
        assert!(runner.commands()[0].starts_with("PGPASSWORD='secret' psql -U auditor -h db.internal -p 6432"));
    }

    #[test]
    fn test_query_success() {
        let runner = ScriptedRunner::new()
            .with_outcome(ExecutionOutcome::default())
            .with_outcome(ExecutionOutcome::new(0, "alice\nbob\n", ""));
        let session = QuerySession::connect(params(), &runner).unwrap();

        let result = session.query("SELECT usename FROM pg_user;", &["app"]).unwrap();
        assert_eq!(result.lines(), vec!["alice", "bob"]);
        assert_eq!(result.to_string(), "PostgreSQL query: SELECT usename FROM pg_user;");
        assert!(runner.commands()[1].contains("-d app"));
    }

    #[test]
    fn test_query_error_text_with_zero_exit() {
        let runner = ScriptedRunner::new()
            .with_outcome(ExecutionOutcome::default())
            .with_outcome(ExecutionOutcome::new(0, "ERROR:  relation \"x\" does not exist", ""));
        let session = QuerySession::connect(params(), &runner).unwrap();

        let err = session.query::<&str>("SELECT * FROM x;", &[]).unwrap_err();
        match err {
            PsqlSessionError::Execution(out) => assert!(out.contains("relation \"x\" does not exist")),
            other => panic!("Expected execution failure, got {other:?}"),
        }
    }

    #[test]
    fn test_query_rejects_unsafe_database_name() {
        let runner = ScriptedRunner::new().with_outcome(ExecutionOutcome::default());
        let session = QuerySession::connect(params(), &runner).unwrap();

        let err = session.query("SELECT 1;", &["app; rm -rf ~"]).unwrap_err();
        assert!(matches!(err, PsqlSessionError::InvalidDatabaseName(_)));
        assert_eq!(runner.commands().len(), 1);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_classified_failure_logged_as_warning() {
        let logs = captured_logs(|| {
            let runner = ScriptedRunner::new()
                .with_outcome(ExecutionOutcome::default())
                .with_outcome(ExecutionOutcome::new(0, "ERROR:  permission denied", ""));
            let session = QuerySession::connect(params(), &runner).unwrap();
            assert!(session.query::<&str>("SELECT 1;", &[]).is_err());
        });

        let line = logs
            .lines()
            .find(|l| l.contains("psql output classified as failure"))
            .expect("failure was not logged");
        assert!(line.contains("WARN"), "unexpected level: {line}");
    }

    #[test]
    fn test_multiline_password_never_logged() {
        let logs = captured_logs(|| {
            let p = ConnectionParams::new(None, "top\nsecret", None, None).unwrap();
            let runner = ScriptedRunner::new().with_outcome(ExecutionOutcome::default());
            QuerySession::connect(p, &runner).unwrap();
        });

        assert!(logs.contains("running psql"));
        assert!(logs.contains("REDACTED"));
        assert!(!logs.contains("secret"));
    }
}
