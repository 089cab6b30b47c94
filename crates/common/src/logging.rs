//! Logging initialisation.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Install a global `tracing` subscriber driven by `RUST_LOG`.
///
/// Falls back to `info` when the variable is unset or unparsable. Calling this
/// more than once is harmless: later calls leave the first subscriber in place.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_FILTER);
}

/// Same as [`init_logging`] with a caller-chosen fallback filter.
pub fn init_logging_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging();
        init_logging_with_default("debug");
    }
}
