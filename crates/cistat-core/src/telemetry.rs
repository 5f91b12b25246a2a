//! Log setup for the `cistat` binary.
//!
//! Filtering comes from `CISTAT_LOG`, then `RUST_LOG`, then a default that
//! keeps dependencies (the HTTP stack in particular) at `warn` while cistat's
//! own crates log at the requested level. Output always goes to stderr so
//! stdout carries only command results.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a filter for cistat only.
pub const LOG_ENV: &str = "CISTAT_LOG";

/// Filter used when neither [`LOG_ENV`] nor `RUST_LOG` is set.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,cistat_core={level},cistat={level}")
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber. Later calls leave the first one in place.
///
/// `json` switches to one flattened JSON object per event, with targets, for
/// log collectors; otherwise events are printed in the compact format.
pub fn init_tracing(json: bool, level: Level) {
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(json);
    let registry = tracing_subscriber::registry().with(env_filter(level));

    let installed = if json {
        registry.with(layer.json().flatten_event(true)).try_init()
    } else {
        registry.with(layer.compact()).try_init()
    };
    installed.ok();
}
