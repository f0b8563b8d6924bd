//! Diagnostic logging setup
//!
//! User-facing output goes to stdout through `console`; tracing events go to
//! stderr and are silent below `warn` unless asked for.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Environment variable holding the log filter (e.g. `rita_kube=debug`)
pub const LOG_ENV: &str = "RITA_LOG";

fn filter(debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy()
}

/// Install the global subscriber; `--debug` overrides `RITA_LOG`
pub fn init(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_target(debug)
        .with_writer(std::io::stderr)
        .try_init();
}
