//! Installs the global `tracing` subscriber.

use crate::errors::BuildError;
use std::str::FromStr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "modflow=info";

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(BuildError::Config(format!("Unknown log format '{other}'"))),
        }
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs a global subscriber filtered by `RUST_LOG`, falling back to [`DEFAULT_DIRECTIVE`].
///
/// # Errors
///
/// Returns [`BuildError::Config`] if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), BuildError> {
    let layer = match format {
        LogFormat::Plain => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
    };
    tracing_subscriber::registry()
        .with(layer.with_filter(filter()))
        .try_init()
        .map_err(|e| BuildError::Config(format!("Tracing already initialised: {e}")))
}
