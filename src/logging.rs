//! Log file setup for hooks and services.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Level used when `RUST_LOG` is not set
pub const DEFAULT_LEVEL: &str = "debug";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Send every log record to `logfile`, appending.
///
/// A second call in the same process keeps the first subscriber.
pub fn setup_logging(logfile: &Path) -> Result<()> {
    if let Some(parent) = logfile.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(logfile)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init();
    if let Err(e) = installed {
        tracing::debug!("Logging already initialised: {}", e);
    }
    Ok(())
}

/// Log to stderr, for interactive commands.
pub fn setup_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
