//! Remote-shell binary entry point.

use std::process::ExitCode;

use remote_shell::cli::{self, Args};
use remote_shell::config::Config;
use remote_shell::termination::{self, TerminationCoordinator};
use remote_shell::{logging, Console, Driver, LineReader, LocalProvider, SessionContext};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'remote-shell --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logging::init_with_filter(&config.log_filter()) {
        eprintln!("warning: logging already initialized: {}", e);
    }

    info!("remote-shell v{}", env!("CARGO_PKG_VERSION"));

    match run(args, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Start the activity, run the session and shut down.
async fn run(args: Args, config: Config) -> remote_shell::Result<u8> {
    // Everything that can fail is set up before the activity exists, so
    // the coordinator is the only way out once it does.
    let signals = termination::listen()?;

    let plan = args.plan();
    let input = if plan.wants_repl() {
        Some(LineReader::spawn_editor()?)
    } else {
        None
    };

    let context = if config.shell.import_env {
        SessionContext::from_process_env()
    } else {
        SessionContext::new()
    };

    let (provider, events) = LocalProvider::start(config.provider_options()).await?;
    let coordinator = TerminationCoordinator::new(provider.clone());

    let mut driver = Driver::new(context, provider, Console::stdio(), coordinator.token())
        .with_prompt(config.shell.prompt.clone())
        .with_banner(config.shell.banner);

    let session = tokio::spawn(async move { driver.run(plan, input).await });
    let report = coordinator.run(session, signals, events).await;

    info!(
        "session finished: {} (released: {}, exit code {})",
        report.cause, report.released, report.exit_code
    );
    Ok(u8::try_from(report.exit_code).unwrap_or(1))
}
