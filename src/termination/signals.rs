//! OS signal listener.

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

/// Termination signals the shell reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("SIGINT"),
            Self::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Install signal handlers and forward every delivery on a channel.
///
/// Must be called from within a tokio runtime.
pub fn listen() -> std::io::Result<mpsc::Receiver<SignalKind>> {
    let (tx, rx) = mpsc::channel(4);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind as UnixSignal};

        let mut interrupt = signal(UnixSignal::interrupt())?;
        let mut terminate = signal(UnixSignal::terminate())?;
        tokio::spawn(async move {
            loop {
                let kind = tokio::select! {
                    Some(()) = interrupt.recv() => SignalKind::Interrupt,
                    Some(()) = terminate.recv() => SignalKind::Terminate,
                    else => break,
                };
                debug!("{} delivered", kind);
                if tx.send(kind).await.is_err() {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                debug!("{} delivered", SignalKind::Interrupt);
                if tx.send(SignalKind::Interrupt).await.is_err() {
                    break;
                }
            }
        });
    }

    Ok(rx)
}
