//! File logging for the terminal client.
//!
//! The TUI owns the terminal, so logs only go to a daily rolling file.

use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the log filter directives
pub const LOG_ENV: &str = "GEMCHAT_LOG";

const LOG_FILE: &str = "gemchat.log";

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the program or buffered lines are lost.
pub fn init(log_dir: &Path) -> WorkerGuard {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Failed to create logs directory: {}", e);
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_filter(env_filter);

    if let Err(e) = tracing_subscriber::registry().with(file_layer).try_init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tracing::info!(dir = %log_dir.display(), "logging initialized");

    guard
}
