use anyhow::{Context, Result};
use chrono::NaiveTime;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::calendar::OrgTimezone;
use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid timezone: {0}. Must be an IANA name such as Europe/Paris")]
    InvalidTimezone(String),

    #[error("Invalid default_time_of_day: {0}. Expected HH:MM")]
    InvalidTimeOfDay(String),

    #[error("Invalid photo max_bytes: must be positive")]
    InvalidPhotoSize,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .haccp/config.yaml (project config, created by init)
    /// 3. .haccp/local.yaml (local overrides, optional)
    /// 4. Environment variables (HACCP_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".haccp/config.yaml"))
            .merge(Yaml::file(".haccp/local.yaml"))
            .merge(Env::prefixed("HACCP_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        if OrgTimezone::parse(&config.organization.timezone).is_err() {
            return Err(ConfigError::InvalidTimezone(config.organization.timezone.clone()));
        }

        if config.photos.max_bytes == 0 {
            return Err(ConfigError::InvalidPhotoSize);
        }
        if config.photos.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "photos.allowed_extensions cannot be empty".to_string(),
            ));
        }

        Self::time_of_day(config)?;
        if config.scheduling.default_repeat_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "scheduling.default_repeat_count must be at least 1".to_string(),
            ));
        }
        if config.scheduling.future_completion_tolerance_minutes < 0 {
            return Err(ConfigError::ValidationFailed(
                "scheduling.future_completion_tolerance_minutes cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed `scheduling.default_time_of_day`.
    pub fn time_of_day(config: &Config) -> Result<NaiveTime, ConfigError> {
        let raw = &config.scheduling.default_time_of_day;
        NaiveTime::parse_from_str(raw, "%H:%M")
            .map_err(|_| ConfigError::InvalidTimeOfDay(raw.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".haccp/haccp.db");
        assert_eq!(config.organization.timezone, "Europe/Paris");
        assert_eq!(config.scheduling.default_horizon_days, 100);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /srv/haccp/plan.db
  max_connections: 2
logging:
  level: debug
  format: json
organization:
  timezone: America/Montreal
scheduling:
  default_time_of_day: '06:30'
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/srv/haccp/plan.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.organization.timezone, "America/Montreal");
        assert_eq!(
            ConfigLoader::time_of_day(&config).unwrap(),
            NaiveTime::from_hms_opt(6, 30, 0).unwrap()
        );
        assert_eq!(config.photos.max_bytes, 5 * 1024 * 1024);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_timezone() {
        let mut config = Config::default();
        config.organization.timezone = "Europe/Atlantis".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_validate_invalid_time_of_day() {
        let mut config = Config::default();
        config.scheduling.default_time_of_day = "25:00".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTimeOfDay(_))
        ));
    }

    #[test]
    fn test_validate_database() {
        let mut config = Config::default();
        config.database.path = " ".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath)));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConnections(0))
        ));
    }

    #[test]
    fn test_validate_photos() {
        let mut config = Config::default();
        config.photos.max_bytes = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidPhotoSize)));
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("HACCP_LOGGING__LEVEL", Some("debug")),
                ("HACCP_ORGANIZATION__TIMEZONE", Some("UTC")),
            ],
            || {
                let config: Config = Figment::new()
                    .merge(Serialized::defaults(Config::default()))
                    .merge(Env::prefixed("HACCP_").split("__"))
                    .extract()
                    .unwrap();
                assert_eq!(config.logging.level, "debug");
                assert_eq!(config.organization.timezone, "UTC");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "logging:\n  level: info\n  format: json\nscheduling:\n  default_repeat_count: 12"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.logging.level, "debug", "Override should win for nested fields");
        assert_eq!(config.logging.format, "json", "Base value should persist when not overridden");
        assert_eq!(config.scheduling.default_repeat_count, 12);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "organization:\n  timezone: Nowhere/Special").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }
}
