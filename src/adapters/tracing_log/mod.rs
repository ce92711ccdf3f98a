// Tracing log adapter - Structured logging using tracing crate

use tracing_subscriber::EnvFilter;

use crate::domain::model::LogSeverity;
use crate::error::{ClipError, ClipResult};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_tracing(level: &str, json: bool) -> ClipResult<()> {
    let level = level.to_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(ClipError::Config {
            message: format!(
                "Invalid log level: {}. Valid levels: {}",
                level,
                LEVELS.join(", ")
            ),
        });
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // Ignore "already initialised" so tests and embedders can call this twice
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    Ok(())
}

/// Mirror a job log entry into tracing at the matching level
pub fn emit(severity: LogSeverity, message: &str) {
    match severity {
        LogSeverity::Debug => tracing::debug!(target: "clipfetch::job", "{}", message),
        LogSeverity::Info | LogSeverity::Success => {
            tracing::info!(target: "clipfetch::job", "{}", message)
        }
        LogSeverity::Warning => tracing::warn!(target: "clipfetch::job", "{}", message),
        LogSeverity::Error => tracing::error!(target: "clipfetch::job", "{}", message),
    }
}
