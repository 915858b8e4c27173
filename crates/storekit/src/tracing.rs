//! Logging utilities with storekit segment prefixes.
//!
//! Provides consistent logging setup across storekit components.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with storekit defaults.
///
/// Sets up tracing-subscriber with:
/// - Environment filter (RUST_LOG)
/// - Compact format suitable for terminal output
pub fn init() {
    init_with_filter("info");
}

/// Initialize tracing with a custom default filter.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Like [`init_with_filter`], but returns `false` instead of panicking when a
/// global subscriber is already installed. Safe to call from every test.
pub fn try_init_with_filter(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_test_writer())
        .try_init()
        .is_ok()
}

/// storekit segment prefixes for logging.
pub mod prefix {
    /// Task series (cancellation, open-request bookkeeping)
    pub const TASK: &str = "↻";
    /// Database connection opened
    pub const OPEN: &str = "⊕";
    /// Database connection closed
    pub const CLOSE: &str = "⊖";
    /// Object store reads, writes and schema upgrades
    pub const STORE: &str = "▤";
}
