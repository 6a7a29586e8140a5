//! Log subscriber setup

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to the
/// configured directives.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed =
        tracing_subscriber::fmt().with_env_filter(filter).with_thread_names(true).try_init();
    match installed {
        Ok(()) => {
            debug!(filter = %config.filter, "Logging initialised");
            true
        }
        Err(_) => false,
    }
}
