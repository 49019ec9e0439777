//! Structured logging setup.
//!
//! The library only emits `tracing` events; embedding applications that already install a
//! subscriber need nothing from here. `init_logging` is a convenience for binaries and tests.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "codec_worker=info";

/// Install a console subscriber filtered by `RUST_LOG`. Safe to call more than once, and a no-op
/// when another global subscriber is already in place.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let installed = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .try_init()
            .is_ok();

        if installed {
            tracing::debug!("console logging initialized");
        } else {
            tracing::debug!("global tracing subscriber already installed, keeping it");
        }
    });
}
