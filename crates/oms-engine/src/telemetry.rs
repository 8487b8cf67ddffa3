//! Tracing subscriber setup for binaries and integration harnesses.

use oms_types::{OmsError, Result};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With `json` set, events are
/// written as one JSON object per line.
///
/// # Errors
/// `Configuration` if `level` is not a valid filter directive or a global
/// subscriber is already installed.
pub fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| OmsError::Configuration(format!("log level {level:?}: {e}")))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| OmsError::Configuration(format!("tracing already initialised: {e}")))
}
