//! Process-wide tracing setup shared by the workspace binaries.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence when set; otherwise `default_level` (e.g.
/// `"info"`, `"debug"`) applies to every target. Calling this twice is a no-op
/// for the second call.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_lowercase()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
