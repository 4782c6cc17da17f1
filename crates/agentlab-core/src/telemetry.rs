//! Tracing setup for the `agentlab` binary.
//!
//! `agentlab session` writes one JSON response per line on stdout, and
//! `simulate --json` streams events there too, so every log line goes to
//! stderr. A reader of stdout only ever sees command output.
//!
//! `RUST_LOG` wins over the configured level when it is set.

use tracing::{Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Install the global subscriber: level filter plus a text or JSON formatter.
///
/// Returns `false` if a subscriber was already installed, which leaves the
/// first one in place.
pub fn init_tracing(json: bool, level: Level) -> bool {
    tracing_subscriber::registry()
        .with(stderr_layer(json))
        .with(level_filter(level))
        .try_init()
        .is_ok()
}

fn stderr_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// `RUST_LOG` if set and valid, otherwise `level`.
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Parse a level name from configuration, falling back to `INFO`.
pub fn parse_level(name: &str) -> Level {
    name.parse().unwrap_or(Level::INFO)
}
