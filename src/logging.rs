use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "progress.log";

/// Holds the background writer of the file layer; logs are flushed when it
/// is dropped, so keep it alive for the whole of `main`.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Stdout logging filtered by `config.log_level`, plus a daily-rolling file
/// when `config.log_dir` is set. Falls back to stdout only if the directory
/// cannot be created.
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let (file_layer, guard) = match config.log_dir.as_deref().and_then(open_log_dir) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

fn open_log_dir(dir: &Path) -> Option<RollingFileAppender> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("failed to create log directory {}: {err}", dir.display());
        return None;
    }
    Some(RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX))
}
