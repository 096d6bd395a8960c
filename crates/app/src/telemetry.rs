//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! `COGNITIA_LOG` controls the filter (e.g. "debug" or detailed directives
//! like "info,services=debug,storage=debug"). `LOG_FORMAT=json` switches to
//! structured output.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("COGNITIA_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info,services=debug,storage=debug"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
