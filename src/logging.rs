//! Logging setup for the `regions` binary.
//!
//! Logs go to stderr so that JSON on stdout stays machine-readable.
//! Verbosity follows `RUST_LOG`, defaulting to `info` (or `debug` with
//! `--verbose`).

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
