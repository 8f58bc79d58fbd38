//! Logging setup
//!
//! Structured logs go through `tracing`. `RUST_LOG` takes precedence over the
//! verbosity flag.

use tracing_subscriber::EnvFilter;

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "docker_registry_proxy=debug"
    } else {
        "docker_registry_proxy=info"
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Describe a secret for logs without revealing it.
pub fn redact(token: &str) -> String {
    format!("<{} chars>", token.len())
}
