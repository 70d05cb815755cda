//! `tracing` subscriber bootstrap shared by hosts and backend modules.
//!
//! A backend `cdylib` carries its own copy of the `tracing` globals, so each
//! side of the module boundary installs its own subscriber.

use tracing_subscriber::EnvFilter;

/// Filter directive variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "LLGL_LOG";

/// Install a formatted subscriber. Calling it again is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
