//! Diagnostic tracing on stderr.
//!
//! Stdout carries exactly one JSON result per command, so all diagnostics go
//! to stderr. The WAL and working buffer under `.protask/memory/` are data,
//! not logs, and are unaffected by the filter here.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "PROTASK_LOG";

/// Initialize the tracing subscriber.
///
/// Reads `PROTASK_LOG`, then `RUST_LOG`. Defaults to `warn`.
///
/// ```bash
/// PROTASK_LOG=protask=debug protask next-task
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
