//! Single-writer shutdown path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use super::{ShutdownToken, SignalKind, TerminationCause, TerminationReport};
use crate::driver::DriverOutcome;
use crate::error::ShellError;
use crate::remote::{RemoteEvent, RemoteHandle};
use crate::session::TerminationState;
use crate::Result;

#[derive(Debug, Default)]
struct Inner {
    state: TerminationState,
    cause: Option<TerminationCause>,
}

/// Owns the remote resource's lifecycle once the session is running.
///
/// All trigger sources go through [`trigger`](Self::trigger), which moves
/// the state from `Active` to `Terminating` under a lock; only the first
/// call wins. [`release`](Self::release) calls the remote handle at most
/// once no matter how many callers race on it.
pub struct TerminationCoordinator {
    remote: Arc<dyn RemoteHandle>,
    inner: Mutex<Inner>,
    release_claimed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl TerminationCoordinator {
    /// Create a coordinator for `remote`.
    pub fn new(remote: Arc<dyn RemoteHandle>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            remote,
            inner: Mutex::new(Inner::default()),
            release_claimed: AtomicBool::new(false),
            shutdown,
        }
    }

    /// A token the driver uses to observe shutdown.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken::new(self.shutdown.subscribe())
    }

    /// Current state.
    pub fn state(&self) -> Result<TerminationState> {
        Ok(self.lock()?.state)
    }

    /// The trigger that won, if any fired yet.
    pub fn cause(&self) -> Result<Option<TerminationCause>> {
        Ok(self.lock()?.cause.clone())
    }

    /// Record a termination trigger.
    ///
    /// Returns `true` if this call moved the session to `Terminating`;
    /// later triggers are ignored and return `false`.
    pub fn trigger(&self, cause: TerminationCause) -> Result<bool> {
        let mut inner = self.lock()?;
        if !inner.state.is_active() {
            debug!("ignoring termination trigger ({}): already {:?}", cause, inner.state);
            return Ok(false);
        }

        inner.state.transition_to(TerminationState::Terminating)?;
        match &cause {
            TerminationCause::SessionEnded => info!("terminating: {}", cause),
            _ => warn!("terminating: {}", cause),
        }
        inner.cause = Some(cause);
        drop(inner);

        self.shutdown.send_replace(true);
        Ok(true)
    }

    /// Release the remote resource.
    ///
    /// Returns `true` for the one call that performed the release and
    /// `false` for every other call. Fails if no trigger has fired yet.
    pub async fn release(&self) -> Result<bool> {
        {
            let inner = self.lock()?;
            if inner.state.is_active() {
                return Err(ShellError::InvalidStateTransition {
                    from: inner.state,
                    to: TerminationState::Terminated,
                });
            }
        }
        if self.release_claimed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        info!("Terminating activity...");
        let released = self.remote.release().await;
        self.lock()?
            .state
            .transition_to(TerminationState::Terminated)?;

        released?;
        info!("activity terminated");
        Ok(true)
    }

    /// Run the shutdown sequence for a session.
    ///
    /// Waits for whichever comes first: the session task finishing, a
    /// signal, or a remote event. A still-running session is then given
    /// the chance to finish its current statement (a second signal aborts
    /// it) before the resource is released.
    pub async fn run(
        &self,
        mut session: JoinHandle<Result<DriverOutcome>>,
        mut signals: mpsc::Receiver<SignalKind>,
        mut events: mpsc::Receiver<RemoteEvent>,
    ) -> TerminationReport {
        let mut session_done = false;
        let cause = tokio::select! {
            joined = &mut session => {
                session_done = true;
                cause_of(joined)
            }
            Some(kind) = signals.recv() => TerminationCause::Signal(kind),
            Some(event) = events.recv() => TerminationCause::Remote(event),
        };

        if let Err(e) = self.trigger(cause.clone()) {
            error!("failed to record termination trigger: {}", e);
        }

        if !session_done {
            drain(&mut session, &mut signals).await;
        }

        let cause = self.cause().ok().flatten().unwrap_or(cause);
        match self.release().await {
            Ok(released) => TerminationReport {
                exit_code: cause.exit_code(),
                cause,
                released,
            },
            Err(e) => {
                error!("failed to release activity: {}", e);
                TerminationReport {
                    cause,
                    released: false,
                    exit_code: 1,
                }
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| ShellError::LockPoisoned)
    }
}

/// Let the session finish its in-flight statement.
async fn drain(
    session: &mut JoinHandle<Result<DriverOutcome>>,
    signals: &mut mpsc::Receiver<SignalKind>,
) {
    tokio::select! {
        joined = &mut *session => {
            if let Ok(Err(e)) = joined {
                warn!("session ended with error during shutdown: {}", e);
            }
        }
        Some(kind) = signals.recv() => {
            warn!("{} received again, abandoning in-flight statement", kind);
            session.abort();
        }
    }
}

fn cause_of(joined: std::result::Result<Result<DriverOutcome>, JoinError>) -> TerminationCause {
    match joined {
        Ok(Ok(DriverOutcome::Interrupted)) => TerminationCause::Signal(SignalKind::Interrupt),
        Ok(Ok(_)) => TerminationCause::SessionEnded,
        Ok(Err(e)) => TerminationCause::Fatal(e.to_string()),
        Err(e) => TerminationCause::Fatal(format!("session task failed: {}", e)),
    }
}
