//! Shell command table.
//!
//! Every command the shell understands is a [`CommandKind`]; a parsed
//! [`Statement`] becomes a [`ShellCommand`] carrying that command's typed
//! arguments. Each command has its own small argument parser.

mod console;
mod dispatch;

use std::path::PathBuf;

use crate::error::ShellError;
use crate::parser::Statement;
use crate::Result;

pub use console::{Console, SharedBuffer};
pub use dispatch::{dispatch, execute};

/// The closed set of shell commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Exit,
    Echo,
    Set,
    Run,
    Upload,
    Download,
    Time,
}

impl CommandKind {
    /// All commands, in help order.
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Help,
        CommandKind::Exit,
        CommandKind::Echo,
        CommandKind::Set,
        CommandKind::Run,
        CommandKind::Upload,
        CommandKind::Download,
        CommandKind::Time,
    ];

    /// Look up a command by name.
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The command's name as typed at the prompt.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Exit => "exit",
            Self::Echo => "echo",
            Self::Set => "set",
            Self::Run => "run",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Time => "time",
        }
    }

    /// Usage line.
    pub fn usage(&self) -> &'static str {
        match self {
            Self::Help => "help [command]",
            Self::Exit => "exit",
            Self::Echo => "echo <text...>",
            Self::Set => "set [name[=value]]",
            Self::Run => "run [options] <command>",
            Self::Upload => "upload <source-file> <destination-file>",
            Self::Download => "download <source-file> [local-path]",
            Self::Time => "time",
        }
    }

    /// One-line description.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Help => "Display available commands.",
            Self::Exit => "Terminate activity and exit shell.",
            Self::Echo => "Display a line of text.",
            Self::Set => "Display or modify shell variables.",
            Self::Run => "Execute a command on the provider using shell.",
            Self::Upload => "Upload a file to the provider.",
            Self::Download => "Download a file from the provider.",
            Self::Time => "Display how long the current activity has been running.",
        }
    }

    /// Argument and option descriptions shown by `help <command>`.
    pub fn details(&self) -> &'static str {
        match self {
            Self::Help => "Arguments:\n  command                 The command to display help for.",
            Self::Exit => "",
            Self::Echo => "Arguments:\n  text                    Text to display.",
            Self::Set => {
                "Arguments:\n  name                    Variable name or variable assignment (ie. var=VALUE)."
            }
            Self::Run => concat!(
                "Arguments:\n",
                "  command                 The command to run on the provider.\n",
                "\n",
                "Options:\n",
                "  -o, --stdout <file>     Redirect stdout to a file.\n",
                "  -e, --stderr <file>     Redirect stderr to a file. Use - to redirect stderr to stdout.\n",
                "\n",
                "Examples:\n",
                "  $ run \"ls /\"\n",
                "  $ run \"cat /proc/cpuinfo\""
            ),
            Self::Upload => concat!(
                "Arguments:\n",
                "  source-file             Path to the file to upload.\n",
                "  destination-file        Remote path to upload the file to."
            ),
            Self::Download => concat!(
                "Arguments:\n",
                "  source-file             Path to the file to download.\n",
                "  local-path              Local path to download the file to. If not provided, file\n",
                "                          will be saved in current directory using the name from\n",
                "                          source file."
            ),
            Self::Time => "",
        }
    }
}

/// Arguments of `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetArgs {
    /// `set`: list every variable.
    List,
    /// `set name`: show one variable.
    Show(String),
    /// `set name=value`: assign.
    Assign { name: String, value: String },
}

/// Where `run` sends the command's stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StderrTarget {
    /// `--stderr -`: append to stdout once the command finishes.
    Stdout,
    /// `--stderr <file>`.
    File(PathBuf),
}

/// Arguments of `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Command line executed by the remote shell.
    pub command: String,
    /// `--stdout <file>`.
    pub stdout: Option<PathBuf>,
    /// `--stderr <file|->`.
    pub stderr: Option<StderrTarget>,
}

/// A statement resolved to a command with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help { topic: Option<String> },
    Exit,
    Echo { text: Vec<String> },
    Set(SetArgs),
    Run(RunArgs),
    Upload { source: PathBuf, destination: String },
    Download { source: String, destination: Option<PathBuf> },
    Time,
}

impl ShellCommand {
    /// Resolve a statement into a command.
    ///
    /// `<command> -h` / `<command> --help` turns into `help <command>`,
    /// unless the flag comes after `--`.
    pub fn parse(statement: &Statement) -> Result<Self> {
        let kind = CommandKind::lookup(statement.name())
            .ok_or_else(|| ShellError::CommandNotFound(statement.name().to_string()))?;
        let args = statement.args();

        let wants_help = args
            .iter()
            .take_while(|a| *a != "--")
            .any(|a| a == "-h" || a == "--help");
        if kind != CommandKind::Help && wants_help {
            return Ok(Self::Help {
                topic: Some(kind.name().to_string()),
            });
        }

        match kind {
            CommandKind::Help => {
                let [topic] = positional::<1>(kind, args)?;
                Ok(Self::Help { topic })
            }
            CommandKind::Exit => {
                positional::<0>(kind, args)?;
                Ok(Self::Exit)
            }
            CommandKind::Echo => {
                if args.is_empty() {
                    return Err(missing(kind, "text"));
                }
                Ok(Self::Echo {
                    text: args.to_vec(),
                })
            }
            CommandKind::Set => {
                let [name] = positional::<1>(kind, args)?;
                parse_set(name)
            }
            CommandKind::Run => parse_run(args).map(Self::Run),
            CommandKind::Upload => {
                let [source, destination] = positional::<2>(kind, args)?;
                match (source, destination) {
                    (Some(source), Some(destination)) => Ok(Self::Upload {
                        source: PathBuf::from(source),
                        destination,
                    }),
                    (None, _) => Err(missing(kind, "source-file")),
                    (_, None) => Err(missing(kind, "destination-file")),
                }
            }
            CommandKind::Download => {
                let [source, destination] = positional::<2>(kind, args)?;
                let source = source.ok_or_else(|| missing(kind, "source-file"))?;
                Ok(Self::Download {
                    source,
                    destination: destination.map(PathBuf::from),
                })
            }
            CommandKind::Time => {
                positional::<0>(kind, args)?;
                Ok(Self::Time)
            }
        }
    }

    /// The kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Help { .. } => CommandKind::Help,
            Self::Exit => CommandKind::Exit,
            Self::Echo { .. } => CommandKind::Echo,
            Self::Set(_) => CommandKind::Set,
            Self::Run(_) => CommandKind::Run,
            Self::Upload { .. } => CommandKind::Upload,
            Self::Download { .. } => CommandKind::Download,
            Self::Time => CommandKind::Time,
        }
    }
}

fn missing(kind: CommandKind, argument: &str) -> ShellError {
    ShellError::invalid_arguments(kind.name(), format!("missing required argument '{}'", argument))
}

/// Collect at most `N` positional arguments into a fixed array.
fn positional<const N: usize>(kind: CommandKind, args: &[String]) -> Result<[Option<String>; N]> {
    if args.len() > N {
        return Err(ShellError::invalid_arguments(
            kind.name(),
            format!("too many arguments, expected at most {}", N),
        ));
    }
    Ok(std::array::from_fn(|i| args.get(i).cloned()))
}

fn parse_set(name: Option<String>) -> Result<ShellCommand> {
    let Some(name) = name else {
        return Ok(ShellCommand::Set(SetArgs::List));
    };

    match name.split_once('=') {
        Some(("", _)) => Err(ShellError::invalid_arguments(
            "set",
            "variable name must not be empty",
        )),
        Some((key, value)) => Ok(ShellCommand::Set(SetArgs::Assign {
            name: key.to_string(),
            value: value.to_string(),
        })),
        None => Ok(ShellCommand::Set(SetArgs::Show(name))),
    }
}

fn parse_run(args: &[String]) -> Result<RunArgs> {
    let name = CommandKind::Run.name();
    let mut command = None;
    let mut stdout = None;
    let mut stderr = None;
    let mut options_done = false;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if !options_done && arg.starts_with('-') && arg.len() > 1 {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
                _ => (arg.as_str(), None),
            };
            let mut value = |option: &str| -> Result<String> {
                inline
                    .clone()
                    .or_else(|| iter.next().cloned())
                    .ok_or_else(|| {
                        ShellError::invalid_arguments(
                            name,
                            format!("option '{}' argument missing", option),
                        )
                    })
            };

            match flag {
                "--" => options_done = true,
                "-o" | "--stdout" => stdout = Some(PathBuf::from(value("--stdout <file>")?)),
                "-e" | "--stderr" => {
                    let target = value("--stderr <file>")?;
                    stderr = Some(if target == "-" {
                        StderrTarget::Stdout
                    } else {
                        StderrTarget::File(PathBuf::from(target))
                    });
                }
                _ => {
                    return Err(ShellError::invalid_arguments(
                        name,
                        format!("unknown option '{}'", flag),
                    ))
                }
            }
            continue;
        }

        if command.is_some() {
            return Err(ShellError::invalid_arguments(
                name,
                format!("too many arguments, unexpected '{}' (quote the command)", arg),
            ));
        }
        command = Some(arg.clone());
    }

    let command = command.ok_or_else(|| missing(CommandKind::Run, "command"))?;
    Ok(RunArgs {
        command,
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<ShellCommand> {
        let stmt = Statement::new(argv.iter().map(|s| s.to_string()).collect()).unwrap();
        ShellCommand::parse(&stmt)
    }

    #[test]
    fn test_lookup() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::lookup(kind.name()), Some(kind));
        }
        assert_eq!(CommandKind::lookup("exec"), None);
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            parse(&["ls", "-la"]),
            Err(ShellError::CommandNotFound(name)) if name == "ls"
        ));
    }

    #[test]
    fn test_help() {
        assert_eq!(parse(&["help"]).unwrap(), ShellCommand::Help { topic: None });
        assert_eq!(
            parse(&["help", "run"]).unwrap(),
            ShellCommand::Help {
                topic: Some("run".into())
            }
        );
        assert!(parse(&["help", "run", "set"]).is_err());
    }

    #[test]
    fn test_command_help_flag() {
        assert_eq!(
            parse(&["upload", "--help"]).unwrap(),
            ShellCommand::Help {
                topic: Some("upload".into())
            }
        );
        assert_eq!(
            parse(&["exit", "-h"]).unwrap(),
            ShellCommand::Help {
                topic: Some("exit".into())
            }
        );
    }

    #[test]
    fn test_help_flag_after_double_dash_is_an_argument() {
        assert_eq!(
            parse(&["run", "--", "-h"]).unwrap(),
            ShellCommand::Run(RunArgs {
                command: "-h".into(),
                stdout: None,
                stderr: None,
            })
        );
    }

    #[test]
    fn test_exit_and_time_reject_arguments() {
        assert_eq!(parse(&["exit"]).unwrap(), ShellCommand::Exit);
        assert_eq!(parse(&["time"]).unwrap(), ShellCommand::Time);
        assert!(matches!(
            parse(&["exit", "now"]),
            Err(ShellError::InvalidArguments { command: "exit", .. })
        ));
        assert!(parse(&["time", "x"]).is_err());
    }

    #[test]
    fn test_echo() {
        assert_eq!(
            parse(&["echo", "a", "b c"]).unwrap(),
            ShellCommand::Echo {
                text: vec!["a".into(), "b c".into()]
            }
        );
        assert!(parse(&["echo"]).is_err());
    }

    #[test]
    fn test_set_forms() {
        assert_eq!(parse(&["set"]).unwrap(), ShellCommand::Set(SetArgs::List));
        assert_eq!(
            parse(&["set", "x"]).unwrap(),
            ShellCommand::Set(SetArgs::Show("x".into()))
        );
        assert_eq!(
            parse(&["set", "x=1"]).unwrap(),
            ShellCommand::Set(SetArgs::Assign {
                name: "x".into(),
                value: "1".into()
            })
        );
        assert_eq!(
            parse(&["set", "url=a=b"]).unwrap(),
            ShellCommand::Set(SetArgs::Assign {
                name: "url".into(),
                value: "a=b".into()
            })
        );
        assert_eq!(
            parse(&["set", "x="]).unwrap(),
            ShellCommand::Set(SetArgs::Assign {
                name: "x".into(),
                value: "".into()
            })
        );
        assert!(parse(&["set", "=1"]).is_err());
        assert!(parse(&["set", "a", "b"]).is_err());
    }

    #[test]
    fn test_run_plain() {
        assert_eq!(
            parse(&["run", "ls /"]).unwrap(),
            ShellCommand::Run(RunArgs {
                command: "ls /".into(),
                stdout: None,
                stderr: None,
            })
        );
    }

    #[test]
    fn test_run_options() {
        let cmd = parse(&["run", "-o", "out.txt", "--stderr", "-", "make"]).unwrap();
        assert_eq!(
            cmd,
            ShellCommand::Run(RunArgs {
                command: "make".into(),
                stdout: Some(PathBuf::from("out.txt")),
                stderr: Some(StderrTarget::Stdout),
            })
        );

        let cmd = parse(&["run", "make", "--stdout=o.log", "-e", "e.log"]).unwrap();
        assert_eq!(
            cmd,
            ShellCommand::Run(RunArgs {
                command: "make".into(),
                stdout: Some(PathBuf::from("o.log")),
                stderr: Some(StderrTarget::File(PathBuf::from("e.log"))),
            })
        );
    }

    #[test]
    fn test_run_double_dash() {
        let cmd = parse(&["run", "--", "-weird"]).unwrap();
        assert!(matches!(cmd, ShellCommand::Run(RunArgs { command, .. }) if command == "-weird"));
    }

    #[test]
    fn test_run_errors() {
        assert!(parse(&["run"]).is_err());
        assert!(parse(&["run", "--stdout"]).is_err());
        assert!(parse(&["run", "--bogus", "ls"]).is_err());
        assert!(parse(&["run", "ls", "/"]).is_err());
    }

    #[test]
    fn test_upload() {
        assert_eq!(
            parse(&["upload", "a.txt", "/remote/a.txt"]).unwrap(),
            ShellCommand::Upload {
                source: PathBuf::from("a.txt"),
                destination: "/remote/a.txt".into()
            }
        );
        assert!(parse(&["upload", "a.txt"]).is_err());
        assert!(parse(&["upload", "a", "b", "c"]).is_err());
    }

    #[test]
    fn test_download() {
        assert_eq!(
            parse(&["download", "/remote/a.txt"]).unwrap(),
            ShellCommand::Download {
                source: "/remote/a.txt".into(),
                destination: None
            }
        );
        assert_eq!(
            parse(&["download", "/remote/a.txt", "local.txt"]).unwrap(),
            ShellCommand::Download {
                source: "/remote/a.txt".into(),
                destination: Some(PathBuf::from("local.txt"))
            }
        );
        assert!(parse(&["download"]).is_err());
    }

    #[test]
    fn test_kind_roundtrip() {
        assert_eq!(parse(&["time"]).unwrap().kind(), CommandKind::Time);
        assert_eq!(parse(&["set"]).unwrap().kind(), CommandKind::Set);
    }
}
