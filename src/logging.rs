//! Logging initialization for the CLI.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CRATE_NAMES: &[&str] = &["orderbook_sync"];

/// Install the global tracing subscriber.
///
/// `verbose` turns on debug output for this crate; otherwise `RUST_LOG` is
/// honoured, falling back to info for this crate and warn for dependencies.
/// Output goes to stderr so that `--json` stdout stays machine readable.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(format!("{},info", directives("debug")))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", directives("info"))))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn directives(level: &str) -> String {
    CRATE_NAMES
        .iter()
        .map(|name| format!("{}={}", name, level))
        .collect::<Vec<_>>()
        .join(",")
}
