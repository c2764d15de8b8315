//! Statement dispatch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::{CommandKind, Console, RunArgs, SetArgs, ShellCommand, StderrTarget};
use crate::error::ShellError;
use crate::parser::Statement;
use crate::remote::RemoteHandle;
use crate::session::SessionContext;
use crate::Result;

/// Dispatch one statement, reporting recoverable errors to the operator.
///
/// Only fatal errors (see [`ShellError::is_fatal`]) are returned.
pub async fn dispatch(
    statement: &Statement,
    ctx: &mut SessionContext,
    remote: &dyn RemoteHandle,
    console: &mut Console,
) -> Result<()> {
    match execute(statement, ctx, remote, console).await {
        Err(err) if !err.is_fatal() => {
            debug!("{}: {}", statement.name(), err);
            console.error(&err)?;
            Ok(())
        }
        other => other,
    }
}

/// Execute one statement and return every error to the caller.
pub async fn execute(
    statement: &Statement,
    ctx: &mut SessionContext,
    remote: &dyn RemoteHandle,
    console: &mut Console,
) -> Result<()> {
    let command = ShellCommand::parse(statement)?;
    ctx.record_statement();
    debug!("dispatch {:?}", command);

    match command {
        ShellCommand::Help { topic } => help(console, topic.as_deref()),
        ShellCommand::Exit => {
            ctx.exit();
            Ok(())
        }
        ShellCommand::Echo { text } => Ok(console.println(text.join(" "))?),
        ShellCommand::Set(args) => set(ctx, console, args),
        ShellCommand::Run(args) => run(remote, console, args).await,
        ShellCommand::Upload {
            source,
            destination,
        } => upload(remote, console, &source, &destination).await,
        ShellCommand::Download {
            source,
            destination,
        } => download(remote, console, &source, destination).await,
        ShellCommand::Time => time(ctx, console),
    }
}

fn help(console: &mut Console, topic: Option<&str>) -> Result<()> {
    let Some(name) = topic else {
        console.println("Commands:")?;
        for kind in CommandKind::ALL {
            console.println(format_args!("  {:<42}{}", kind.usage(), kind.summary()))?;
        }
        return Ok(());
    };

    let kind =
        CommandKind::lookup(name).ok_or_else(|| ShellError::CommandNotFound(name.to_string()))?;
    console.println(format_args!("Usage: {}", kind.usage()))?;
    console.println("")?;
    console.println(kind.summary())?;
    if !kind.details().is_empty() {
        console.println("")?;
        console.println(kind.details())?;
    }
    Ok(())
}

fn set(ctx: &mut SessionContext, console: &mut Console, args: SetArgs) -> Result<()> {
    match args {
        SetArgs::List => {
            for (name, value) in ctx.sorted_variables() {
                console.println(format_args!("{}={}", name, value))?;
            }
        }
        SetArgs::Show(name) => {
            let value = ctx.get_var(&name).unwrap_or_default();
            console.println(format_args!("{}={}", name, value))?;
        }
        SetArgs::Assign { name, value } => {
            debug!("set {}", name);
            ctx.set_var(name, value);
        }
    }
    Ok(())
}

async fn run(remote: &dyn RemoteHandle, console: &mut Console, args: RunArgs) -> Result<()> {
    let result = remote.run_command(&args.command).await?;

    // stderr joins stdout only after the command finished; nothing is interleaved.
    let stdout = match args.stderr {
        Some(StderrTarget::Stdout) => result.combined_output(),
        _ => result.stdout.clone(),
    };

    match &args.stdout {
        Some(path) => write_redirect(path, &stdout).await?,
        None => console.write_out(&stdout)?,
    }

    match &args.stderr {
        Some(StderrTarget::File(path)) => write_redirect(path, &result.stderr).await?,
        Some(StderrTarget::Stdout) => {}
        None => console.write_err(&result.stderr)?,
    }

    if !result.success() {
        return Err(ShellError::RemoteOperation(format!(
            "command error: {}",
            result.failure_message()
        )));
    }
    Ok(())
}

async fn write_redirect(path: &Path, text: &str) -> Result<()> {
    tokio::fs::write(path, text).await.map_err(|e| {
        ShellError::LocalValidation(format!("cannot write to {}: {}", path.display(), e))
    })
}

async fn upload(
    remote: &dyn RemoteHandle,
    console: &mut Console,
    source: &Path,
    destination: &str,
) -> Result<()> {
    if !is_file(source).await {
        return Err(ShellError::LocalValidation(format!(
            "source file {} does not exist. Upload aborted.",
            source.display()
        )));
    }

    console.println(format_args!("Uploading {}...", source.display()))?;
    let outcome = remote.upload_file(source, destination).await?;
    if !outcome.ok {
        return Err(ShellError::RemoteOperation(format!(
            "failed to upload file: {}",
            outcome.message.unwrap_or_default()
        )));
    }
    console.println("File uploaded.")?;
    Ok(())
}

async fn download(
    remote: &dyn RemoteHandle,
    console: &mut Console,
    source: &str,
    destination: Option<PathBuf>,
) -> Result<()> {
    let destination = match destination {
        Some(path) => path,
        None => Path::new(source)
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| {
                ShellError::invalid_arguments(
                    CommandKind::Download.name(),
                    format!("cannot derive a local file name from '{}'", source),
                )
            })?,
    };

    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if !is_dir(dir).await {
        return Err(ShellError::LocalValidation(format!(
            "destination directory {} does not exist. Download aborted.",
            dir.display()
        )));
    }

    console.println(format_args!("Downloading {}...", source))?;
    let outcome = remote.download_file(source, &destination).await?;
    if !outcome.ok {
        return Err(ShellError::RemoteOperation(format!(
            "failed to download file: {}",
            outcome.message.unwrap_or_default()
        )));
    }
    console.println("File downloaded.")?;
    Ok(())
}

fn time(ctx: &SessionContext, console: &mut Console) -> Result<()> {
    let (Some(started), Some(elapsed)) = (ctx.started_at(), ctx.elapsed()) else {
        return Err(ShellError::RemoteOperation(
            "activity has not started yet".to_string(),
        ));
    };

    // Sub-millisecond precision only adds noise.
    let elapsed = Duration::from_millis(elapsed.as_millis() as u64);
    console.println(format_args!(
        "Activity started at {}.",
        started.format("%b %-d, %Y, %-I:%M:%S %p")
    ))?;
    console.println(format_args!(
        "Activity duration: {}",
        humantime::format_duration(elapsed)
    ))?;
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
