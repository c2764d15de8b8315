//! Shared test helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use remote_shell::{
    Console, Driver, ExecutionResult, RemoteError, RemoteHandle, SessionContext,
    TerminationCoordinator, TransferResult,
};

/// A [`RemoteHandle`] that records every call.
#[derive(Default)]
pub struct MockRemote {
    pub runs: AtomicUsize,
    pub uploads: AtomicUsize,
    pub downloads: AtomicUsize,
    pub releases: AtomicUsize,
    /// Command lines passed to `run_command`, in order.
    pub commands: Mutex<Vec<String>>,
    /// Answer for `run_command`; defaults to an empty success.
    pub run_result: Mutex<Option<ExecutionResult>>,
    /// Answer for transfers; defaults to success.
    pub transfer_result: Mutex<Option<TransferResult>>,
    /// How long `run_command` takes.
    pub run_delay: Mutex<Option<Duration>>,
    /// How long `release` takes.
    pub release_delay: Mutex<Option<Duration>>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answering(result: ExecutionResult) -> Arc<Self> {
        let mock = Self::default();
        *mock.run_result.lock().unwrap() = Some(result);
        Arc::new(mock)
    }

    pub fn slow_run(delay: Duration) -> Arc<Self> {
        let mock = Self::default();
        *mock.run_delay.lock().unwrap() = Some(delay);
        Arc::new(mock)
    }

    pub fn slow_release(delay: Duration) -> Arc<Self> {
        let mock = Self::default();
        *mock.release_delay.lock().unwrap() = Some(delay);
        Arc::new(mock)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn transfer(&self) -> TransferResult {
        self.transfer_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| TransferResult::ok(0))
    }
}

impl RemoteHandle for MockRemote {
    fn run_command<'a>(
        &'a self,
        command: &'a str,
    ) -> BoxFuture<'a, Result<ExecutionResult, RemoteError>> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.commands.lock().unwrap().push(command.to_string());
            let delay = *self.run_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let result = self.run_result.lock().unwrap().clone();
            Ok(result.unwrap_or_else(|| ExecutionResult::new("", "", Duration::ZERO).with_exit_code(0)))
        })
    }

    fn upload_file<'a>(
        &'a self,
        _local: &'a Path,
        _remote: &'a str,
    ) -> BoxFuture<'a, Result<TransferResult, RemoteError>> {
        Box::pin(async move {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(self.transfer())
        })
    }

    fn download_file<'a>(
        &'a self,
        _remote: &'a str,
        _local: &'a Path,
    ) -> BoxFuture<'a, Result<TransferResult, RemoteError>> {
        Box::pin(async move {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(self.transfer())
        })
    }

    fn release(&self) -> BoxFuture<'_, Result<(), RemoteError>> {
        Box::pin(async move {
            self.releases.fetch_add(1, Ordering::SeqCst);
            let delay = *self.release_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        })
    }
}

/// Write a batch file into `dir`.
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// A driver over `remote` writing into captured buffers.
pub fn driver(
    remote: &Arc<MockRemote>,
    coordinator: &TerminationCoordinator,
) -> (Driver, remote_shell::commands::SharedBuffer, remote_shell::commands::SharedBuffer) {
    let (console, out, err) = Console::captured();
    let driver = Driver::new(
        SessionContext::new(),
        remote.clone(),
        console,
        coordinator.token(),
    )
    .with_banner(false);
    (driver, out, err)
}
