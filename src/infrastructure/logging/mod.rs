// Logging module - Logging infrastructure
use crate::domain::error::{PicoCtlError, PicoCtlResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(level: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { level };
    format!("picoctl={},warn", level)
}

/// Initialize logging system
///
/// Diagnostics go to stderr so they never interleave with the console
/// prompt and replies on stdout.
pub fn init_logging(level: &str, verbose: bool) -> PicoCtlResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
                .with_file(verbose)
                .with_line_number(verbose),
        )
        .try_init()
        .map_err(|e| PicoCtlError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("picoctl logging initialized");
    Ok(())
}
