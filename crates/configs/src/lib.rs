//! # Configs
//!
//! Typed configuration for the platform client and the telemetry
//! bootstrap. Settings layer defaults, an optional per-run-mode file,
//! and `APP_*` environment variables, in that order.

mod settings;
mod telemetry;

pub use settings::{AppConfig, BackendConfig, BehaviorConfig, ConfigError};
pub use telemetry::init_telemetry;
