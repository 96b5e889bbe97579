//! Tracing bootstrap.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Respects `RUST_LOG` when set, falling back to `default_filter`
/// otherwise. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
