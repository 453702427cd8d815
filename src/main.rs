//! apneascreen: sleep apnea screening terminal application.
//!
//! Main entry point. Sets up sanitized logging, then hands the terminal to
//! the TUI.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use apneascreen::adapters::sanitize::SanitizingMakeWriter;
use apneascreen::tui::App;

const LOG_MODE_ENV: &str = "APNEASCREEN_LOG_MODE";
const LOG_FILE_ENV: &str = "APNEASCREEN_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "apneascreen.log";

/// Install the global subscriber. The returned guard flushes on drop.
///
/// Log lines written to the terminal would corrupt the TUI, so `auto` mode
/// logs to a file whenever stdout is interactive.
fn init_logging() -> Result<WorkerGuard> {
    let log_mode = std::env::var(LOG_MODE_ENV).unwrap_or_else(|_| "auto".to_string());
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" => false,
        _ => std::io::stdout().is_terminal(),
    };

    let (writer, guard) = if use_file {
        let log_file = std::env::var(LOG_FILE_ENV).unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        if let Some(parent) = Path::new(&log_file).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("opening log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn main() -> Result<()> {
    let _guard = init_logging()?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting apneascreen");

    let mut app = App::new()?;
    app.run()?;

    tracing::info!("apneascreen shutdown complete");
    Ok(())
}
