//! Structured logger setup.
//!
//! Console output for operators, plus an optional daily-rolling NDJSON file
//! for the dashboard host to aggregate.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber. `RUST_LOG` wins over the configured
/// level. Safe to call more than once; later calls are no-ops.
pub fn init_logger(log_dir: Option<&Path>, level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    let file_layer = log_dir.map(|dir| {
        // NDJSON under `<dir>/agentpulse.log.YYYY-MM-DD`
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "agentpulse.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
