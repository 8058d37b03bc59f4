//! Structured Logger
//!
//! Wraps `tracing` with a human console layer, a JSON rolling file layer,
//! and `RUST_LOG` level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Prefix of the daily log files (`chatmem.log.YYYY-MM-DD`).
pub const LOG_FILE_NAME: &str = "chatmem.log";

/// Initialize the global logger.
///
/// `RUST_LOG` wins over `level`. The console layer is further limited to
/// `console_level` and writes to stderr, so replies on stdout stay readable.
/// Calling this twice is a no-op.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str, console_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_NAME);

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true)
        .with_filter(EnvFilter::new(console_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
