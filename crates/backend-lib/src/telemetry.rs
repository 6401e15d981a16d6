//! Tracing subscriber setup.
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, Settings};
use crate::error::AppError;

/// Install the global subscriber. `RUST_LOG` wins over `settings.log_level`.
pub fn init_tracing(settings: &Settings) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .map_err(|e| AppError::Config(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match settings.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
    };
    installed.map_err(|e| AppError::Internal(e.to_string()))
}
