//! Error types for remote-shell.

use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ParseError;
use crate::remote::RemoteError;
use crate::session::TerminationState;

/// Main error type for shell operations.
///
/// Most variants are reported to the operator and the session carries on;
/// see [`ShellError::is_fatal`] for the ones that end the session.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The input line could not be tokenized or split into statements.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The first word of a statement does not name a known command.
    #[error("command not found: {0}. Type ? for help.")]
    CommandNotFound(String),

    /// A known command was given arguments it does not accept.
    #[error("{command}: {reason}. Type `{command} --help` for more information.")]
    InvalidArguments {
        command: &'static str,
        reason: String,
    },

    /// The remote side completed the operation with a non-success outcome.
    #[error("{0}")]
    RemoteOperation(String),

    /// The remote handle itself failed to carry out the operation.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A local file or directory required by the command is missing.
    #[error("{0}")]
    LocalValidation(String),

    /// A batch file passed on the command line does not exist.
    #[error("script file {0} does not exist")]
    ScriptNotFound(PathBuf),

    /// I/O error on the shell's own streams or script files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid termination state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: TerminationState,
        to: TerminationState,
    },

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl ShellError {
    /// Build an argument error for `command`.
    pub fn invalid_arguments(command: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            command,
            reason: reason.into(),
        }
    }

    /// Whether this error must end the session.
    ///
    /// Non-fatal errors are printed and the shell moves on to the next
    /// statement; fatal ones bubble up to the termination coordinator.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Parse(_)
                | Self::CommandNotFound(_)
                | Self::InvalidArguments { .. }
                | Self::RemoteOperation(_)
                | Self::Remote(_)
                | Self::LocalValidation(_)
        )
    }
}

/// Convenience Result type for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
