//! Layered settings: hard defaults, then `config/{run_mode}.toml` when it
//! exists, then `APP_*` environment variables. In development a `.env`
//! file is honored before the environment is read.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Connection details for the managed backend.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    /// The project API key. Never logged; `SecretString` redacts it from
    /// `Debug` output.
    pub api_key: SecretString,
}

/// Client-side tunables.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BehaviorConfig {
    pub debounce_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl BehaviorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub behavior: BehaviorConfig,
}

impl AppConfig {
    /// Loads settings for the run mode in `APP_RUN_MODE` (default
    /// `development`). Environment variables use `__` between path
    /// segments, e.g. `APP_BACKEND__URL`.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode =
            std::env::var("APP_RUN_MODE").unwrap_or_else(|_| "development".to_string());
        if run_mode == "development" {
            dotenvy::dotenv().ok();
        }

        let settings = config::Config::builder()
            .set_default("backend.url", "http://localhost:54321")?
            .set_default("backend.api_key", "")?
            .set_default("behavior.debounce_ms", 500)?
            .set_default("behavior.retry_max_attempts", 3)?
            .set_default("behavior.retry_base_delay_ms", 1_000)?
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The debounce default is asserted only in the override test; these
    // tests share one process environment.
    #[test]
    fn defaults_cover_every_field() {
        let config = AppConfig::load().expect("defaults load");
        assert_eq!(config.behavior.retry_max_attempts, 3);
        assert_eq!(config.behavior.retry_base_delay(), Duration::from_secs(1));
        assert!(!config.backend.url.is_empty());
    }

    #[test]
    fn environment_overrides_defaults() {
        std::env::set_var("APP_BEHAVIOR__DEBOUNCE_MS", "250");
        let config = AppConfig::load().expect("loads with override");
        std::env::remove_var("APP_BEHAVIOR__DEBOUNCE_MS");
        assert_eq!(config.behavior.debounce(), Duration::from_millis(250));
    }

    #[test]
    fn the_api_key_never_prints() {
        let config = AppConfig::load().expect("defaults load");
        let debugged = format!("{:?}", config.backend);
        assert!(!debugged.contains("api_key: \"\""));
        assert!(debugged.contains("REDACTED"));
    }
}
