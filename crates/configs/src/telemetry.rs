//! Tracing bootstrap. Safe to call more than once; only the first call
//! installs the subscriber.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Installs the global `tracing` subscriber: `RUST_LOG` drives the
/// filter (default `info`), `APP_LOG_JSON=1` switches to JSON lines.
pub fn init_telemetry() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        if env_bool("APP_LOG_JSON", false) {
            tracing_subscriber::fmt().with_env_filter(filter).json().init();
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
        tracing::debug!("telemetry installed");
    });
}
