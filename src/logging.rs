//! Tracing setup shared by both binaries.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}
