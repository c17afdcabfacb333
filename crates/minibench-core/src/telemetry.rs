//! Logging for the `minibench` binary.
//!
//! Logs go to stderr so stdout carries only the verdict and listings. The
//! suite lifecycle events from [`crate::obs`] show at `info`; patch-engine
//! rejections and script `console.*` output (target `minibench::script`)
//! only at `debug`. The HTTP stack used by the remote runner is held at
//! `warn` unless `RUST_LOG` says otherwise.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates too chatty at `debug` to be useful in a benchmark log.
const QUIET_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Filter directives used when `RUST_LOG` is unset.
fn default_directives(level: Level) -> String {
    let mut directives = level.as_str().to_ascii_lowercase();
    for krate in QUIET_DEPENDENCIES {
        directives.push_str(&format!(",{}=warn", krate));
    }
    directives
}

/// Install the global subscriber; `json` switches to one JSON object per line.
///
/// The first call wins, later ones are ignored.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}
