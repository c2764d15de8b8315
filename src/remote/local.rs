//! Loopback provider.
//!
//! Runs commands through the host shell inside a private directory that
//! plays the part of the rented machine's filesystem. It stands in for a
//! real leasing backend when the shell is run on its own.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ExecutionResult, RemoteError, RemoteEvent, RemoteHandle, TransferResult};

/// Default lifetime of an activity.
pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(3600);

/// Settings for the loopback provider.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Directory standing in for the remote filesystem. A fresh scratch
    /// directory under the system temp dir is created (and removed on
    /// release) when unset.
    pub workdir: Option<PathBuf>,
    /// How long the activity lives before the provider destroys it.
    pub activity_timeout: Duration,
    /// Limit for a single command.
    pub command_timeout: Option<Duration>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            workdir: None,
            activity_timeout: DEFAULT_ACTIVITY_TIMEOUT,
            command_timeout: None,
        }
    }
}

/// A [`RemoteHandle`] backed by the local machine.
pub struct LocalProvider {
    root: PathBuf,
    scratch: Mutex<Option<TempDir>>,
    command_timeout: Option<Duration>,
    released: AtomicBool,
    events: mpsc::Sender<RemoteEvent>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl LocalProvider {
    /// Prepare the activity and return it with its event stream.
    ///
    /// The activity is ready for commands when this returns.
    pub async fn start(
        options: ProviderOptions,
    ) -> Result<(Arc<Self>, mpsc::Receiver<RemoteEvent>), RemoteError> {
        let (root, scratch) = match options.workdir {
            Some(dir) => {
                tokio::fs::create_dir_all(&dir).await?;
                (dir, None)
            }
            None => {
                let scratch = tempfile::Builder::new().prefix("remote-shell-").tempdir()?;
                (scratch.path().to_path_buf(), Some(scratch))
            }
        };

        let (tx, rx) = mpsc::channel(8);
        let timeout = options.activity_timeout;
        let timeout_tx = tx.clone();
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!("activity timeout of {:?} reached", timeout);
            let _ = timeout_tx
                .send(RemoteEvent::Destroyed {
                    reason: "activity timeout".to_string(),
                })
                .await;
        });

        info!("activity ready in {}", root.display());

        let provider = Arc::new(Self {
            root,
            scratch: Mutex::new(scratch),
            command_timeout: options.command_timeout,
            released: AtomicBool::new(false),
            events: tx,
            watchdog: Mutex::new(Some(watchdog)),
        });
        Ok((provider, rx))
    }

    /// Directory holding the activity's files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether [`release`](RemoteHandle::release) has run.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Push an event to the shell as if the provider had reported it.
    pub async fn notify(&self, event: RemoteEvent) -> Result<(), RemoteError> {
        self.events
            .send(event)
            .await
            .map_err(|_| RemoteError::Failed("event stream closed".to_string()))
    }

    fn ensure_active(&self) -> Result<(), RemoteError> {
        if self.is_released() {
            Err(RemoteError::Released)
        } else {
            Ok(())
        }
    }

    /// Map a remote path onto the activity root.
    fn resolve(&self, remote: &str) -> Result<PathBuf, RemoteError> {
        let relative = Path::new(remote.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(RemoteError::Failed(format!(
                "path {} leaves the activity root",
                remote
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn execute(&self, command_line: &str) -> Result<ExecutionResult, RemoteError> {
        self.ensure_active()?;
        debug!("run: {}", command_line);

        let start = Instant::now();
        let mut command = shell_command(command_line);
        command
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.command_timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| RemoteError::Timeout(limit))??,
            None => command.output().await?,
        };

        let result = ExecutionResult::new(
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            start.elapsed(),
        );
        Ok(match output.status.code() {
            Some(code) => result.with_exit_code(code),
            None => result.with_message("command terminated by signal"),
        })
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<TransferResult, RemoteError> {
        self.ensure_active()?;
        let target = self.resolve(remote)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(match tokio::fs::copy(local, &target).await {
            Ok(bytes) => TransferResult::ok(bytes),
            Err(e) => TransferResult::failed(e.to_string()),
        })
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<TransferResult, RemoteError> {
        self.ensure_active()?;
        let source = self.resolve(remote)?;
        Ok(match tokio::fs::copy(&source, local).await {
            Ok(bytes) => TransferResult::ok(bytes),
            Err(e) => TransferResult::failed(format!("{}: {}", remote, e)),
        })
    }

    async fn shutdown(&self) -> Result<(), RemoteError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(watchdog) = self.watchdog.lock().ok().and_then(|mut w| w.take()) {
            watchdog.abort();
        }

        let scratch = self.scratch.lock().ok().and_then(|mut s| s.take());
        if let Some(scratch) = scratch {
            tokio::task::spawn_blocking(move || scratch.close())
                .await
                .map_err(|e| RemoteError::Failed(format!("cleanup task failed: {}", e)))??;
        }

        info!("activity released");
        Ok(())
    }
}

impl RemoteHandle for LocalProvider {
    fn run_command<'a>(
        &'a self,
        command: &'a str,
    ) -> BoxFuture<'a, Result<ExecutionResult, RemoteError>> {
        Box::pin(self.execute(command))
    }

    fn upload_file<'a>(
        &'a self,
        local: &'a Path,
        remote: &'a str,
    ) -> BoxFuture<'a, Result<TransferResult, RemoteError>> {
        Box::pin(self.upload(local, remote))
    }

    fn download_file<'a>(
        &'a self,
        remote: &'a str,
        local: &'a Path,
    ) -> BoxFuture<'a, Result<TransferResult, RemoteError>> {
        Box::pin(self.download(remote, local))
    }

    fn release(&self) -> BoxFuture<'_, Result<(), RemoteError>> {
        Box::pin(self.shutdown())
    }
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}
