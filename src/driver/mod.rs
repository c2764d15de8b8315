//! Execution driver.
//!
//! Feeds lines from batch files, a one-shot command and the interactive
//! prompt through the parser and the dispatcher, strictly in order:
//!
//! ```text
//! BatchFiles -> SingleExecute -> Interactive -> Done
//! ```
//!
//! The driver never releases the remote resource. It stops once the
//! session has exited or the [`ShutdownToken`] fires, and hands control
//! back to the termination coordinator.

mod input;
mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::commands::{dispatch, Console};
use crate::error::ShellError;
use crate::parser::parse_line;
use crate::remote::RemoteHandle;
use crate::session::SessionContext;
use crate::termination::ShutdownToken;
use crate::Result;

pub use input::{InputEvent, LineReader};

/// Default interactive prompt.
pub const DEFAULT_PROMPT: &str = "remote> ";

/// Greeting printed when the REPL starts.
pub const BANNER: &str = "Type ? for help, exit to end the session.";

/// What the driver should read, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Batch files, run first and in this order.
    pub files: Vec<PathBuf>,
    /// One-shot command line, run after the files.
    pub execute: Option<String>,
    /// Enter the REPL even when files or a command were given.
    pub interactive: bool,
}

impl ExecutionPlan {
    /// Whether the plan ends in the interactive prompt.
    pub fn wants_repl(&self) -> bool {
        (self.files.is_empty() && self.execute.is_none()) || self.interactive
    }
}

/// How the driver finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOutcome {
    /// Every input source was exhausted.
    Completed,
    /// An `exit` statement ended the session.
    Exited,
    /// Ctrl-C at the prompt.
    Interrupted,
    /// The termination coordinator asked the driver to stop.
    Cancelled,
}

/// Runs an [`ExecutionPlan`] against one session.
pub struct Driver {
    context: SessionContext,
    remote: Arc<dyn RemoteHandle>,
    console: Console,
    shutdown: ShutdownToken,
    prompt: String,
    banner: bool,
}

impl Driver {
    /// Create a driver.
    pub fn new(
        context: SessionContext,
        remote: Arc<dyn RemoteHandle>,
        console: Console,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            context,
            remote,
            console,
            shutdown,
            prompt: DEFAULT_PROMPT.to_string(),
            banner: true,
        }
    }

    /// Use a different prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Print (or suppress) the greeting on REPL entry.
    pub fn with_banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }

    /// The session state.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Run `plan` until the session ends.
    ///
    /// `input` is only read when the plan enters the REPL. Returns an error
    /// only for failures that must end the session.
    pub async fn run(
        &mut self,
        plan: ExecutionPlan,
        input: Option<LineReader>,
    ) -> Result<DriverOutcome> {
        // The remote resource is ready by the time a driver exists.
        self.context.mark_started();

        for file in &plan.files {
            if self.should_stop() {
                return Ok(self.outcome());
            }
            self.run_file(file).await?;
        }

        if let Some(line) = &plan.execute {
            if self.should_stop() {
                return Ok(self.outcome());
            }
            self.run_line(line).await?;
        }

        if plan.wants_repl() && !self.should_stop() {
            match input {
                Some(input) => return self.run_interactive(input).await,
                None => debug!("no interactive input available"),
            }
        }

        Ok(self.outcome())
    }

    /// Run every line of a batch file.
    pub async fn run_file(&mut self, path: &Path) -> Result<()> {
        let script = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShellError::ScriptNotFound(path.to_path_buf())
            } else {
                ShellError::Io(e)
            }
        })?;
        info!("running {}", path.display());

        // `lines` drops the `\r` of CRLF endings.
        for line in script.lines() {
            if self.should_stop() {
                break;
            }
            self.run_line(line).await?;
        }
        Ok(())
    }

    /// Parse one line and dispatch its statements in order.
    ///
    /// A parse error is reported and the whole line is skipped.
    pub async fn run_line(&mut self, line: &str) -> Result<()> {
        let statements = match parse_line(line, self.context.variables()) {
            Ok(statements) => statements,
            Err(e) => {
                self.console.error(&e)?;
                return Ok(());
            }
        };

        for statement in &statements {
            if self.should_stop() {
                break;
            }
            dispatch(
                statement,
                &mut self.context,
                self.remote.as_ref(),
                &mut self.console,
            )
            .await?;
        }
        Ok(())
    }

    async fn run_interactive(&mut self, mut input: LineReader) -> Result<DriverOutcome> {
        if self.banner {
            self.console.println(BANNER)?;
        }

        loop {
            if self.should_stop() {
                return Ok(self.outcome());
            }

            let shutdown = self.shutdown.clone();
            let event = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    debug!("prompt abandoned on shutdown");
                    self.context.exit();
                    return Ok(DriverOutcome::Cancelled);
                }
                event = input.next_line(&self.prompt) => event,
            };

            match event {
                InputEvent::Line(line) => self.run_line(&line).await?,
                InputEvent::Eof => {
                    self.context.exit();
                    return Ok(DriverOutcome::Completed);
                }
                InputEvent::Interrupted => {
                    self.context.exit();
                    return Ok(DriverOutcome::Interrupted);
                }
            }
        }
    }

    fn should_stop(&mut self) -> bool {
        if self.shutdown.is_triggered() && !self.context.is_exited() {
            self.context.exit();
        }
        self.context.is_exited()
    }

    fn outcome(&self) -> DriverOutcome {
        if self.shutdown.is_triggered() {
            DriverOutcome::Cancelled
        } else if self.context.is_exited() {
            DriverOutcome::Exited
        } else {
            DriverOutcome::Completed
        }
    }
}
