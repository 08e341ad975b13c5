// src/logging.rs
// =============================================================================
// Diagnostic logging setup.
//
// Log lines go to stderr so that stdout stays reserved for the summary
// (and for clean JSON with --json). RUST_LOG overrides the default level.
// =============================================================================

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let default = if verbose { "dir_mirror=debug" } else { "dir_mirror=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // try_init: a second call (e.g. from tests) is not an error worth dying for
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
