//! Tracing subscriber setup.
//!
//! Log lines go to stderr so command output on stdout stays clean. The
//! filter defaults to `docport=info,tower_http=info` and can be overridden
//! with `RUST_LOG`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "docport=info,tower_http=info";

/// Installs the global subscriber. A second call is a no-op.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "docport=debug,tower_http=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
