//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the process: JSON lines, `RUST_LOG`-filtered,
/// falling back to `info`.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_default("info");
}

/// Initialize with an explicit fallback filter for hosts that want a
/// different level when `RUST_LOG` is unset (e.g. `"debug"` on a dev box).
pub fn init_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
