//! Tracing setup.
//!
//! `RUST_LOG` wins when set; otherwise `default_filter` is used. Output goes
//! to stderr so it does not interleave with the chat transcript on stdout.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "anonchat_client=info";
pub const VERBOSE_FILTER: &str = "anonchat_client=debug,anonchat_shared=debug";

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
