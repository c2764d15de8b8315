//! Remote operation result types.

use std::time::Duration;

/// Result of a remote command.
///
/// Output is collected in full before the result is returned; the remote
/// interface does not stream.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Standard output of the command.
    pub stdout: String,
    /// Standard error of the command.
    pub stderr: String,
    /// Exit code (if the command completed).
    pub exit_code: Option<i32>,
    /// Provider message explaining a failure.
    pub message: Option<String>,
    /// Execution duration.
    pub duration: Duration,
}

impl ExecutionResult {
    /// Create a new execution result.
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, duration: Duration) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration,
            ..Default::default()
        }
    }

    /// Set the exit code.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attach a failure message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Check if command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Message describing why the command failed.
    pub fn failure_message(&self) -> String {
        match (&self.message, self.exit_code) {
            (Some(message), _) => message.clone(),
            (None, Some(code)) => format!("exited with code {}", code),
            (None, None) => "command did not complete".to_string(),
        }
    }

    /// Stdout followed by stderr, as used by `run --stderr -`.
    pub fn combined_output(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }
}

/// Result of a file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Whether the transfer succeeded.
    pub ok: bool,
    /// Provider message, set on failure.
    pub message: Option<String>,
    /// Bytes transferred.
    pub bytes: u64,
}

impl TransferResult {
    /// A successful transfer of `bytes` bytes.
    pub fn ok(bytes: u64) -> Self {
        Self {
            ok: true,
            message: None,
            bytes,
        }
    }

    /// A failed transfer.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            bytes: 0,
        }
    }
}
