//! Command-line interface for remote-shell.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::driver::ExecutionPlan;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Batch files, run in order.
    pub files: Vec<PathBuf>,
    /// Single command line to run after the batch files.
    pub execute: Option<String>,
    /// Enter the REPL after the batch files and `--execute`.
    pub interactive: bool,
    /// Do not seed shell variables from the process environment.
    pub no_env: bool,
    /// Activity lifetime in seconds (overrides config).
    pub timeout_secs: Option<u64>,
    /// Root directory of the loopback provider (overrides config).
    pub workdir: Option<PathBuf>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Args {
    /// The input sources the driver should work through.
    pub fn plan(&self) -> ExecutionPlan {
        ExecutionPlan {
            files: self.files.clone(),
            execute: self.execute.clone(),
            interactive: self.interactive,
        }
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('e') | Long("execute") => {
                result.execute = Some(parser.value()?.parse()?);
            }
            Short('i') | Long("interactive") => {
                result.interactive = true;
            }
            Short('n') | Long("no-env") => {
                result.no_env = true;
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                let secs = value
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ArgsError::InvalidValue("timeout", value))?;
                result.timeout_secs = Some(secs);
            }
            Short('w') | Long("workdir") => {
                result.workdir = Some(parser.value()?.parse()?);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                result.files.push(PathBuf::from(val));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"remote-shell {version}
Interactive shell for a rented remote compute resource

USAGE:
    remote-shell [OPTIONS] [FILE...]

ARGS:
    <FILE>...               Batch files to run, in order

OPTIONS:
    -e, --execute <CMD>     Run a single command line after the batch files
    -i, --interactive       Enter the interactive prompt afterwards
    -n, --no-env            Do not import environment variables
    -t, --timeout <SECS>    Activity lifetime in seconds [default: 3600]
    -w, --workdir <DIR>     Directory standing in for the remote filesystem
    -c, --config <FILE>     Path to configuration file (JSON)
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

Batch files run first, then --execute. Without either the shell starts
interactively; with them it exits afterwards unless --interactive is given.

ENVIRONMENT VARIABLES:
    REMOTE_SHELL_PROMPT     Interactive prompt (overrides config)
    REMOTE_SHELL_TIMEOUT    Activity lifetime in seconds (overrides config)
    REMOTE_SHELL_WORKDIR    Provider directory (overrides config)
    REMOTE_SHELL_LOG_LEVEL  Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Interactive session
    remote-shell

    # Run a script, then keep the prompt open
    remote-shell -i setup.txt

    # One-shot command
    remote-shell -e 'run "uname -a"'
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("remote-shell {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
