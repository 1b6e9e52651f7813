//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "BARANGAY_LOG";
pub const DEFAULT_DIRECTIVE: &str = "barangay=info";

static INIT: Once = Once::new();

/// Initialize logging with the `barangay=info` fallback.
///
/// Reads `BARANGAY_LOG` for per-module levels, e.g.
/// `BARANGAY_LOG=barangay_distribution::allocation=debug`.
pub fn init_tracing() {
    init_tracing_with_default(DEFAULT_DIRECTIVE);
}

/// Same as [`init_tracing`] with a caller-chosen fallback directive.
/// Logs go to stderr so stdout stays clean for reports and the TUI.
///
/// Idempotent: only the first call installs a subscriber.
pub fn init_tracing_with_default(default_directive: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .with(filter)
            .init();
    });
}
