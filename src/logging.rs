use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "REMOTELINK_LOG";

/// Route `tracing` events to stderr so they never mix with remote output on
/// stdout. `REMOTELINK_LOG` takes precedence over the verbosity flag.
pub fn init_logging(verbose: bool) -> Result<()> {
    let fallback = if verbose { "remotelink=debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}
