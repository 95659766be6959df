use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Creates the log directory if it doesn't exist.
fn ensure_log_dir(dir: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Installs the global subscriber writing to `<dir>/geotrust.log`, rotated
/// daily. Keep the returned guard alive or buffered lines are lost.
pub fn initialize_logging(dir: &str) -> WorkerGuard {
    // The subscriber is not up yet, and its file sink needs the directory,
    // so a failure also goes to stderr.
    let dir_error = ensure_log_dir(dir).err();
    if let Some(e) = &dir_error {
        eprintln!("Failed to create log directory '{}': {}", dir, e);
    }

    let file_appender = tracing_appender::rolling::daily(dir, "geotrust.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    match dir_error {
        Some(e) => tracing::error!("Failed to create log directory '{}': {}", dir, e),
        None => tracing::info!("Logging initialized successfully."),
    }
    guard
}
