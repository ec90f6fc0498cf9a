//! Tracing setup for applications embedding the service.
//!
//! The library only emits `tracing` events; nothing is printed unless the host
//! installs a subscriber. `init_tracing` installs the usual fmt subscriber
//! filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber driven by `RUST_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
}
