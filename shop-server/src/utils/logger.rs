//! Logging infrastructure
//!
//! Console output always; a daily rolling file under `log_dir` when given.
//! `RUST_LOG` overrides the configured level.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the console logger at `info`
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
///
/// Returns the guard of the file writer; keep it alive for the life of the
/// process or buffered lines are lost.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let registry = tracing_subscriber::registry().with(filter).with(console);

    if let Some(dir) = log_dir
        && Path::new(dir).exists()
    {
        let file_appender = tracing_appender::rolling::daily(dir, "shop-server");
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        let file = fmt::layer().with_ansi(false).with_writer(writer);
        if registry.with(file).try_init().is_err() {
            eprintln!("Logger already initialized");
        }
        return Some(guard);
    }

    if registry.try_init().is_err() {
        eprintln!("Logger already initialized");
    }
    None
}
