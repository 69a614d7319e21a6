//! Diagnostic logging setup.
//!
//! User-facing progress is printed to stdout by the commands; this installs the
//! `tracing` subscriber for diagnostic events, written to stderr.
//! `BROWSER_MATRIX_LOG` takes an `EnvFilter` directive and wins over `--verbose`.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "BROWSER_MATRIX_LOG";

/// Installs the global subscriber. Calling it more than once is harmless.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "browser_matrix=debug"
    } else {
        "browser_matrix=warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
