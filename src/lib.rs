//! # remote-shell
//!
//! Interactive command shell for a single rented remote compute resource.
//!
//! The shell reads lines from batch files, a one-shot command or an
//! interactive prompt, parses them into statements and dispatches a small
//! fixed set of commands (`run`, `upload`, `download`, `set`, `echo`,
//! `time`, `exit`, `help`) against a [`RemoteHandle`].
//!
//! ## Features
//!
//! - **Shell-like parsing**: quoting, escapes, `$VAR` substitution, `;` and `#`
//! - **Three input sources**: batch files, `--execute`, and a `rustyline` REPL
//! - **Single shutdown path**: `exit`, OS signals and remote failure events
//!   all end in exactly one release of the remote resource
//!
//! ## Quick Start
//!
//! ```no_run
//! use remote_shell::{
//!     Console, Driver, ExecutionPlan, LocalProvider, ProviderOptions, SessionContext,
//!     TerminationCoordinator,
//! };
//!
//! #[tokio::main]
//! async fn main() -> remote_shell::Result<()> {
//!     remote_shell::logging::try_init().ok();
//!
//!     let (provider, events) = LocalProvider::start(ProviderOptions::default()).await?;
//!     let coordinator = TerminationCoordinator::new(provider.clone());
//!
//!     let mut driver = Driver::new(
//!         SessionContext::new(),
//!         provider,
//!         Console::stdio(),
//!         coordinator.token(),
//!     );
//!     let plan = ExecutionPlan {
//!         execute: Some(r#"run "uname -a"; time"#.to_string()),
//!         ..Default::default()
//!     };
//!     let session = tokio::spawn(async move { driver.run(plan, None).await });
//!
//!     let signals = remote_shell::termination::listen()?;
//!     let report = coordinator.run(session, signals, events).await;
//!     println!("{} (exit {})", report.cause, report.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod parser;
pub mod remote;
pub mod session;
pub mod termination;

// Re-export commonly used types
pub use commands::{Console, ShellCommand};
pub use driver::{Driver, DriverOutcome, ExecutionPlan, InputEvent, LineReader};
pub use error::{Result, ShellError};
pub use parser::{parse_line, ParseError, Statement};
pub use remote::{
    ExecutionResult, LocalProvider, ProviderOptions, RemoteError, RemoteEvent, RemoteHandle,
    TransferResult,
};
pub use session::{SessionContext, TerminationState};
pub use termination::{TerminationCause, TerminationCoordinator, TerminationReport};
