//! Log setup: a daily rolling file under `<root>/logs/` plus warnings on stderr.
//!
//! `RUST_LOG` controls the file filter (default `info`). Setting
//! `COFFEE_DEBUG_LOG=1` forces `debug`.

use std::env;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const DEBUG_ENV: &str = "COFFEE_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "coffee.log";

/// Installs the global subscriber. Keep the returned guard alive for the
/// whole process or buffered file lines are lost.
pub fn init(logs_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let logs_dir = logs_dir.filter(|dir| match fs_err::create_dir_all(dir) {
        Ok(()) => true,
        Err(err) => {
            eprintln!("coffee: file logging disabled: {}", err);
            false
        }
    });

    let (file_layer, guard) = match logs_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}

fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn file_filter() -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
