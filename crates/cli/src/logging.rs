//! Logging setup for the binary.

use std::io::IsTerminal;

use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, writing to stderr.
///
/// `filter` wins over `RUST_LOG`; an unparseable filter falls back to
/// `info`.
pub fn setup_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}
