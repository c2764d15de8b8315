//! Termination coordination.
//!
//! Three independent sources can end a session:
//! - the session itself finishing (`exit`, end of input, fatal error);
//! - an OS interrupt or termination signal;
//! - a [`RemoteEvent`] reporting that the resource is gone.
//!
//! The [`TerminationCoordinator`] selects over all of them, lets the first
//! one win, and releases the remote resource exactly once.

mod coordinator;
mod signals;

use std::fmt;

use tokio::sync::watch;

use crate::remote::RemoteEvent;

pub use coordinator::TerminationCoordinator;
pub use signals::{listen, SignalKind};

/// What ended the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationCause {
    /// The session finished on its own (`exit` or end of input).
    SessionEnded,
    /// An OS signal (or Ctrl-C at the prompt).
    Signal(SignalKind),
    /// The remote side reported a failure.
    Remote(RemoteEvent),
    /// An unrecoverable error during dispatch.
    Fatal(String),
}

impl TerminationCause {
    /// Process exit status for this cause.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SessionEnded | Self::Signal(_) => 0,
            Self::Remote(_) | Self::Fatal(_) => 1,
        }
    }
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionEnded => write!(f, "session ended"),
            Self::Signal(kind) => write!(f, "{} received", kind),
            Self::Remote(event) => write!(f, "{}", event),
            Self::Fatal(message) => write!(f, "fatal error: {}", message),
        }
    }
}

/// Outcome of the shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationReport {
    /// The trigger that won.
    pub cause: TerminationCause,
    /// Whether this shutdown performed the release.
    pub released: bool,
    /// Status the process should exit with.
    pub exit_code: i32,
}

/// Read side of the coordinator's shutdown flag.
///
/// The driver checks it before every statement and while waiting for input.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub(crate) fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// Whether a termination trigger has fired.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until a termination trigger fires.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|triggered| *triggered).await.is_err();
        if closed {
            // Coordinator gone without triggering: nothing will ever fire.
            std::future::pending::<()>().await;
        }
    }
}
