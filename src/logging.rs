//! tracing subscriber setup
//!
//! Logs go to stderr so JSON written to stdout stays parseable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither RUST_LOG nor the config sets one
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber.
///
/// RUST_LOG wins over `fallback`. Calling this twice is harmless.
pub fn init(fallback: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
