//! Session variables and activity bookkeeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// Mutable state of one shell session.
///
/// This tracks the shell variables used for `$NAME` substitution, the
/// moment the remote activity became ready, and the exit flag raised by
/// the `exit` command or by a termination trigger.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Shell variables.
    variables: HashMap<String, String>,
    /// When the remote activity became ready for commands.
    started_at: Option<(Instant, DateTime<Local>)>,
    /// No further statements are dispatched once this is set.
    exited: bool,
    /// Number of statements dispatched so far.
    statement_count: u64,
}

impl SessionContext {
    /// Create a new context with no variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with the given variables.
    pub fn with_variables(variables: HashMap<String, String>) -> Self {
        Self {
            variables,
            ..Default::default()
        }
    }

    /// Create a context seeded with a copy of the process environment.
    pub fn from_process_env() -> Self {
        Self::with_variables(std::env::vars().collect())
    }

    /// Get all variables.
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    /// Get a specific variable.
    pub fn get_var(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|s| s.as_str())
    }

    /// Set a variable, replacing any previous value.
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// All variables sorted by name.
    pub fn sorted_variables(&self) -> Vec<(&str, &str)> {
        let mut vars: Vec<_> = self
            .variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        vars.sort_unstable_by(|a, b| a.0.cmp(b.0));
        vars
    }

    /// Record that the remote activity is ready.
    ///
    /// Only the first call has an effect.
    pub fn mark_started(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some((Instant::now(), Local::now()));
        }
    }

    /// Wall-clock time at which the activity became ready.
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at.map(|(_, wall)| wall)
    }

    /// Time elapsed since the activity became ready.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|(instant, _)| instant.elapsed())
    }

    /// Raise the exit flag.
    pub fn exit(&mut self) {
        self.exited = true;
    }

    /// Check whether the session has exited.
    pub fn is_exited(&self) -> bool {
        self.exited
    }

    /// Count a dispatched statement.
    pub fn record_statement(&mut self) {
        self.statement_count += 1;
    }

    /// Get the number of statements dispatched.
    pub fn statement_count(&self) -> u64 {
        self.statement_count
    }
}
