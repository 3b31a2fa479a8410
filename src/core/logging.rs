//! Logging setup.
//!
//! The TUI owns the terminal, so all output goes to a daily-rolling JSON log
//! file under the user's data directory. `log` records from dependencies are
//! bridged into `tracing`.

use std::fs;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log file prefix; the appender adds a `.YYYY-MM-DD` suffix.
pub const LOG_FILE_PREFIX: &str = "book-inventory.log";

/// Directory the log files are written to.
pub fn log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("book-inventory").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize file-only logging for the TUI.
///
/// Keep the returned guard alive for the life of the program; dropping it
/// flushes and stops the background writer.
pub fn init_tui() -> WorkerGuard {
    let log_dir = log_dir();

    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(env_filter());

    // No stdout layer: the TUI owns the terminal. `try_init` also installs
    // the `log` -> `tracing` bridge.
    if let Err(e) = tracing_subscriber::registry().with(file_layer).try_init() {
        eprintln!("Failed to initialize tracing: {}", e);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dir = %log_dir.display(),
        "logging initialized"
    );

    guard
}
