//! Logging bootstrap.
//!
//! The teacher project's `telemetry.rs` wires up full OpenTelemetry
//! tracer/meter providers with OTLP export and a `Drop`-based graceful
//! shutdown — built for a long-running HTTP facilitator process. This crate
//! has no server loop and no metrics/export surface of its own (outside
//! this workspace's scope per design note §9), so its telemetry bootstrap
//! is reduced to what every other crate here already emits through via
//! `tracing`: an `EnvFilter`-driven `tracing_subscriber::fmt` layer a
//! caller's binary can install once at startup.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing_subscriber::fmt` subscriber filtered by `RUST_LOG`
/// (falling back to `info` when unset) as the global default.
///
/// Call this once, early, from a caller's binary or test harness. Library
/// code in this workspace never installs a subscriber itself — only emits
/// spans and events through the `tracing` facade when the `telemetry`
/// feature is enabled on the relevant crate.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_when_called_more_than_once() {
        init();
        init();
    }
}
