//! Logging initialization and configuration.
//!
//! Log lines go to stderr so they never mix with command output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the configuration sets one.
pub const DEFAULT_FILTER: &str = "remote_shell=warn";

fn layers(filter: EnvFilter) -> impl SubscriberInitExt {
    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr),
    )
}

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `remote_shell=warn`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    layers(filter).init();
}

/// Initialize the logging system with an explicit filter directive.
///
/// An unparsable directive falls back to the default filter.
pub fn init_with_filter(directive: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("invalid log filter '{}': {}", directive, e);
        EnvFilter::new(DEFAULT_FILTER)
    });
    layers(filter).try_init()
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    layers(filter).try_init()
}
