//! Configuration parsing and validation for curfew
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - The daily blocking period
//! - Enforcement cadence and unblock gate limits
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Like [`load_config`], but a missing file yields the built-in defaults.
///
/// Any other failure (unreadable, malformed, invalid) is still an error.
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Ok(Policy::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Policy::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let policy = parse_config("config_version = 1").unwrap();
        assert_eq!(policy.schedule.to_string(), "08:00-18:00");
        assert_eq!(policy.unblock.max_attempts_per_hour, 2);
    }

    #[test]
    fn parse_custom_config() {
        let config = r#"
            config_version = 1

            [schedule]
            start = "21:30"
            end = "07:00"

            [unblock]
            max_attempts_per_hour = 1
            challenge_timeout_seconds = 90
            memorize_seconds = 5

            [resolver]
            flush_command = ["nscd", "-i", "hosts"]
        "#;

        let policy = parse_config(config).unwrap();
        assert!(policy.schedule.wraps_midnight());
        assert_eq!(policy.unblock.max_attempts_per_hour, 1);
        assert_eq!(policy.unblock.challenge_timeout, Duration::from_secs(90));
        assert_eq!(policy.unblock.memorize_for, Duration::from_secs(5));
        assert_eq!(policy.resolver.flush_command, vec!["nscd", "-i", "hosts"]);
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_values() {
        let config = r#"
            config_version = 1
            [unblock]
            max_attempts_per_hour = 0
        "#;

        match parse_config(config) {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let policy = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(policy.unblock.challenge_length, DEFAULT_CHALLENGE_LENGTH);

        // A file that exists must still parse
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "config_version = ").unwrap();
        assert!(matches!(
            load_config_or_default(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
