/// Command Runner Module
///
/// Executes composed command lines and hands back exit status and output.
/// Sessions only see the `CommandRunner` trait, so tests can replay canned
/// psql output without a server.

use std::io;
use std::process::{Command, Stdio};
use tracing::trace;

/// Exit status, stdout and stderr of one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutcome {
    pub fn new(exit_status: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        ExecutionOutcome {
            exit_status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Runs one shell command line to completion.
pub trait CommandRunner {
    fn run(&self, command: &str) -> io::Result<ExecutionOutcome>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    /// Uses a specific POSIX shell binary.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        ShellRunner {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> io::Result<ExecutionOutcome> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = child.wait_with_output()?;

        // Killed by a signal
        let exit_status = output.status.code().unwrap_or(-1);
        trace!(exit_status, "shell command finished");

        Ok(ExecutionOutcome {
            exit_status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &str) -> io::Result<ExecutionOutcome> {
        (**self).run(command)
    }
}
