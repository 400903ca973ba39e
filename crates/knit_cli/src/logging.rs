//! Tracing subscriber setup.
//!
//! Library crates log through `tracing`; the CLI decides what is shown. The
//! `KNIT_LOG` variable takes an `EnvFilter` directive (e.g.
//! `knit_link=debug`) and overrides `--quiet` / `--verbose`.
//! `KNIT_LOG_FORMAT=json` switches to one JSON object per event.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding a filter directive.
const LOG_ENV: &str = "KNIT_LOG";

/// Environment variable selecting the log format.
const LOG_FORMAT_ENV: &str = "KNIT_LOG_FORMAT";

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line text.
    Compact,
    /// JSON lines, for tool integration.
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Installs the global subscriber. Logs go to stderr.
pub fn init(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose)));

    let layer = match LogFormat::from_env() {
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed(),
    };

    // A subscriber may already be installed when running inside tests.
    let _ = tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init();
}

fn default_directive(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}
