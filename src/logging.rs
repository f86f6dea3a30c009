//! Structured logging setup
//!
//! Console logging through `tracing-subscriber`. The filter is read from
//! `EMSYS_LOG`, then `RUST_LOG`, and defaults to `info`.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Default filter directive when no environment variable is set
pub const DEFAULT_FILTER: &str = "info";

/// Initialize logging once per process
///
/// Safe to call repeatedly; a subscriber installed elsewhere (for example by
/// a test harness) is left in place.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let directive = filter_directive(|key| std::env::var(key).ok());

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(EnvFilter::new(directive.clone())),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::debug!(filter = %directive, "logging initialized");
    });
}

/// Pick the filter directive from the environment
fn filter_directive(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("EMSYS_LOG")
        .or_else(|| lookup("RUST_LOG"))
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}
