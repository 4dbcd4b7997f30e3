//! Log output setup
//!
//! Stdout plus an optional append-only file under `~/.assistant-bridge/logs`,
//! both with local timestamps. `RUST_LOG` overrides the configured filter.

use crate::config::{self, LoggingConfig};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

/// Log file name inside the log directory
const LOG_FILE_NAME: &str = "assistant-bridge.log";

/// Format timestamps using the system's local time via chrono
struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Directory holding log files (~/.assistant-bridge/logs)
pub fn log_dir() -> PathBuf {
    config::get_app_dir().join("logs")
}

fn env_filter(default: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// Returns false when a subscriber was already installed (e.g. by the host or
/// an earlier call); the existing one stays in place.
pub fn init(settings: &LoggingConfig) -> bool {
    let log_file = if settings.log_to_file {
        let dir = log_dir();
        let _ = std::fs::create_dir_all(&dir);
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE_NAME))
            .ok()
    } else {
        None
    };

    let stdout_layer = tracing_subscriber::fmt::layer().with_timer(LocalTimer);
    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_timer(LocalTimer)
            .with_ansi(false)
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter(&settings.filter))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Logging initialised (filter: {})", settings.filter);
    }
    installed
}
