//! Logging initialization for the CLI.
//!
//! Verbosity is flag-driven: `--verbose` turns on debug logging for the kiln
//! crates, `--quiet` restricts output to errors, and the default level is
//! info unless `RUST_LOG` overrides it.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global tracing subscriber.
///
/// Must be called once, before any logging happens. Later calls are ignored
/// so tests can initialize freely.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("kiln_cli=debug,kiln_bundler=debug,kiln_config=debug")
    } else if quiet {
        EnvFilter::new("kiln_cli=error,kiln_bundler=error,kiln_config=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kiln_cli=info,kiln_bundler=info,kiln_config=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_does_not_panic() {
        init_logger(false, false, true);
        init_logger(true, false, true);
        init_logger(false, true, true);
    }
}
