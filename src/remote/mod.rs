//! Remote execution layer.
//!
//! The shell talks to the rented resource only through [`RemoteHandle`]:
//! - run a command line and collect its complete output;
//! - copy files to and from the resource;
//! - release the resource.
//!
//! Out-of-band failures reach the shell as [`RemoteEvent`]s on a channel
//! handed over together with the handle.

mod local;
mod result;

use std::fmt;
use std::path::Path;

use futures_util::future::BoxFuture;
use thiserror::Error;

pub use local::{LocalProvider, ProviderOptions};
pub use result::{ExecutionResult, TransferResult};

/// Failure of the remote handle itself (as opposed to a command that ran
/// and failed).
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The resource has already been released.
    #[error("remote activity has been released")]
    Released,

    /// The operation did not finish in time.
    #[error("remote operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Transport or provider failure.
    #[error("remote failure: {0}")]
    Failed(String),

    /// Local I/O error while talking to the provider.
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asynchronous notification about the remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    /// The resource was destroyed by the provider.
    Destroyed { reason: String },
    /// The workload failed outside of any command.
    WorkloadFailed { reason: String },
}

impl fmt::Display for RemoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroyed { reason } => write!(f, "activity destroyed: {}", reason),
            Self::WorkloadFailed { reason } => write!(f, "workload failed: {}", reason),
        }
    }
}

/// Capability to execute work on the rented resource.
///
/// The handle is produced by the leasing layer; the shell shares it between
/// the dispatcher and the termination coordinator, and only the coordinator
/// calls [`release`](RemoteHandle::release).
pub trait RemoteHandle: Send + Sync {
    /// Run a command line through the remote shell.
    fn run_command<'a>(&'a self, command: &'a str)
        -> BoxFuture<'a, Result<ExecutionResult, RemoteError>>;

    /// Copy a local file to `remote` on the resource.
    fn upload_file<'a>(
        &'a self,
        local: &'a Path,
        remote: &'a str,
    ) -> BoxFuture<'a, Result<TransferResult, RemoteError>>;

    /// Copy `remote` from the resource to a local file.
    fn download_file<'a>(
        &'a self,
        remote: &'a str,
        local: &'a Path,
    ) -> BoxFuture<'a, Result<TransferResult, RemoteError>>;

    /// Give the resource back to the provider.
    fn release(&self) -> BoxFuture<'_, Result<(), RemoteError>>;
}
