/// # Test Utilities Module
///
/// A scripted `CommandRunner` for exercising sessions without a PostgreSQL
/// server or a psql binary. Outcomes are replayed in order and every command
/// line is recorded so tests can check what would have been spawned.

use crate::runner::{CommandRunner, ExecutionOutcome};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

/// Replays queued outcomes, one per `run` call.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outcomes: RefCell<VecDeque<Result<ExecutionOutcome, String>>>,
    commands: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an outcome for the next unanswered `run` call.
    pub fn with_outcome(self, outcome: ExecutionOutcome) -> Self {
        self.outcomes.borrow_mut().push_back(Ok(outcome));
        self
    }

    /// Queues a spawn failure with the given message.
    pub fn with_spawn_error(self, message: &str) -> Self {
        self.outcomes.borrow_mut().push_back(Err(message.to_string()));
        self
    }

    /// Every command line received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    /// Number of commands that would have spawned a process.
    pub fn spawn_count(&self) -> usize {
        self.commands.borrow().len()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str) -> io::Result<ExecutionOutcome> {
        self.commands.borrow_mut().push(command.to_string());
        match self.outcomes.borrow_mut().pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(io::Error::new(io::ErrorKind::NotFound, message)),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("no scripted outcome for command #{}", self.spawn_count()),
            )),
        }
    }
}
