//! Logging setup for the wbemping binary
//!
//! Logs go to stderr so stdout stays reserved for the probe result.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
const QUIET_FILTER: &str = "wbemping=warn";

/// Filter used with `--verbose` when `RUST_LOG` is not set
const VERBOSE_FILTER: &str = "wbemping=info";

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        QUIET_FILTER
    }
}

/// Initialize tracing
///
/// # Environment Variables
///
/// - `RUST_LOG`: overrides the filter (e.g. `wbemping=debug`)
/// - `WBEMPING_LOG_FORMAT`: `json` for JSON lines, anything else for compact text
pub fn init_logging(verbose: bool) -> Result<()> {
    let log_format =
        std::env::var("WBEMPING_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter(verbose)))?;

    match log_format.as_str() {
        "json" => {
            // Machine consumption: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
