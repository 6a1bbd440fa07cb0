//! Configuration validation rules.
//!
//! Applied to `AppConfig` values after they have been loaded from
//! environment, files, or defaults.

use crate::cache::exchanges::MAX_PAGE_SIZE;
use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `db_path` is empty
    /// - `default_page_size` is 0 or exceeds the listing maximum
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "db_path".into(), reason: "must not be empty".into() });
        }

        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "default_page_size".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.default_page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                field: "default_page_size".into(),
                reason: format!("must not exceed {MAX_PAGE_SIZE}"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_db_path() {
        let config = AppConfig { db_path: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "db_path"));
    }

    #[test]
    fn test_validate_page_size_zero() {
        let config = AppConfig { default_page_size: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_page_size"));
    }

    #[test]
    fn test_validate_page_size_exceeds_limit() {
        let config = AppConfig { default_page_size: 101, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_page_size"));
    }

    #[test]
    fn test_validate_max_values() {
        let config = AppConfig { default_page_size: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
