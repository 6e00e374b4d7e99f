//! Diagnostics for the wrapper, captured by the batch platform's log collector.
//!
//! The optimizer's own stdout/stderr are inherited and never pass through
//! tracing.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` so the resolved parameter line is
/// always part of the task log.
///
/// # Example
/// ```bash
/// RUST_LOG=wrapper=debug wrapper run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
