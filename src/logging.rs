//! Log output for the semgate binary.
//!
//! Logs go to stderr so that the gated command owns stdout. `RUST_LOG`
//! overrides the level picked by `--verbose`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("semgate=debug")
        } else {
            EnvFilter::new("semgate=info")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
