use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "pagegrep";

/// Keeps the file writer flushing until the process exits
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

// Console output on stderr plus a daily log file under `logs/`.
// If the log directory cannot be created, only the console layer is installed.
pub fn init_logging() -> LogGuard {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter());

    let log_dir = Path::new(LOG_DIR);
    let (file_layer, file_guard) = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(log_dir);
            match file_appender {
                Ok(appender) => {
                    let (writer, guard) = tracing_appender::non_blocking(appender);
                    let layer = fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_filter(env_filter());
                    (Some(layer), Some(guard))
                }
                Err(err) => {
                    eprintln!("Could not open log file: {err}");
                    (None, None)
                }
            }
        }
        Err(err) => {
            eprintln!("Could not create {LOG_DIR}: {err}");
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    LogGuard {
        _file_guard: file_guard,
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
