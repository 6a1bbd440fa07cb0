//! Application configuration with layered loading.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if MEMENTO_CONFIG_FILE set)
//! 3. Environment variables (MEMENTO_*)

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via MEMENTO_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Page size used when a listing request does not name one.
    ///
    /// Set via MEMENTO_DEFAULT_PAGE_SIZE environment variable.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./memento-cache.sqlite")
}

fn default_page_size() -> u32 {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_page_size: default_page_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadFailed` if the file or environment cannot be
    /// parsed, and `ConfigError::Invalid` if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered provider stack used by [`AppConfig::load`].
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MEMENTO_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("MEMENTO_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Extract and validate a configuration from an arbitrary provider stack.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::load`].
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./memento-cache.sqlite"));
        assert_eq!(config.default_page_size, 20);
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("db_path = \"/tmp/chat.sqlite\"\ndefault_page_size = 50"));

        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/chat.sqlite"));
        assert_eq!(config.default_page_size, 50);
    }

    #[test]
    fn test_invalid_layer_fails_validation() {
        let figment =
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("default_page_size = 0"));

        let result = AppConfig::from_figment(figment);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_page_size"));
    }

    #[test]
    fn test_malformed_layer_fails_to_load() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("default_page_size = \"many\""));

        assert!(matches!(AppConfig::from_figment(figment), Err(ConfigError::LoadFailed(_))));
    }
}
