//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Shortest accepted process sweep interval
pub const MIN_SWEEP_INTERVAL_MS: u64 = 100;

/// Longest accepted challenge text
pub const MAX_CHALLENGE_LENGTH: usize = 64;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid time format for {field} '{value}': {message}")]
    InvalidTimeFormat {
        field: String,
        value: String,
        message: String,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

impl ValidationError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(schedule) = &config.schedule {
        let fields = [("schedule.start", &schedule.start), ("schedule.end", &schedule.end)];
        for (field, value) in fields {
            if let Err(message) = parse_time(value) {
                errors.push(ValidationError::InvalidTimeFormat {
                    field: field.to_string(),
                    value: value.clone(),
                    message,
                });
            }
        }
    }

    if let Some(ms) = config.enforcement.sweep_interval_ms
        && ms < MIN_SWEEP_INTERVAL_MS
    {
        errors.push(ValidationError::invalid(
            "enforcement.sweep_interval_ms",
            format!("must be at least {}", MIN_SWEEP_INTERVAL_MS),
        ));
    }

    if config.enforcement.schedule_interval_seconds == Some(0) {
        errors.push(ValidationError::invalid(
            "enforcement.schedule_interval_seconds",
            "must be at least 1",
        ));
    }

    if config.unblock.max_attempts_per_hour == Some(0) {
        errors.push(ValidationError::invalid(
            "unblock.max_attempts_per_hour",
            "must be at least 1, otherwise nothing could ever be unblocked",
        ));
    }

    if config.unblock.challenge_timeout_seconds == Some(0) {
        errors.push(ValidationError::invalid(
            "unblock.challenge_timeout_seconds",
            "must be at least 1",
        ));
    }

    if let Some(len) = config.unblock.challenge_length
        && !(1..=MAX_CHALLENGE_LENGTH).contains(&len)
    {
        errors.push(ValidationError::invalid(
            "unblock.challenge_length",
            format!("must be between 1 and {}", MAX_CHALLENGE_LENGTH),
        ));
    }

    if let Some(command) = &config.resolver.flush_command
        && command.first().is_some_and(|program| program.trim().is_empty())
    {
        errors.push(ValidationError::invalid(
            "resolver.flush_command",
            "program name cannot be empty",
        ));
    }

    if let Some(helper) = &config.service.elevate_with
        && helper.trim().is_empty()
    {
        errors.push(ValidationError::invalid(
            "service.elevate_with",
            "cannot be empty",
        ));
    }

    if let Some(hosts) = &config.service.hosts_file
        && hosts.as_os_str().is_empty()
    {
        errors.push(ValidationError::GlobalError(
            "service.hosts_file cannot be empty".into(),
        ));
    }

    errors
}

/// Parse HH:MM time format
pub fn parse_time(s: &str) -> Result<(u8, u8), String> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 2 {
        return Err("Expected HH:MM format".into());
    }

    let hour: u8 = parts[0]
        .parse()
        .map_err(|_| "Invalid hour".to_string())?;
    let minute: u8 = parts[1]
        .parse()
        .map_err(|_| "Invalid minute".to_string())?;

    if hour >= 24 {
        return Err("Hour must be 0-23".into());
    }
    if minute >= 60 {
        return Err("Minute must be 0-59".into());
    }

    Ok((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawSchedule;

    fn base() -> RawConfig {
        toml::from_str("config_version = 1").unwrap()
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("14:30").unwrap(), (14, 30));
        assert_eq!(parse_time("00:00").unwrap(), (0, 0));
        assert_eq!(parse_time("23:59").unwrap(), (23, 59));
        assert_eq!(parse_time(" 8:05 ").unwrap(), (8, 5));

        assert!(parse_time("24:00").is_err());
        assert!(parse_time("12:60").is_err());
        assert!(parse_time("12:00:00").is_err());
        assert!(parse_time("invalid").is_err());
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_config(&base()).is_empty());
    }

    #[test]
    fn bad_schedule_times_are_reported_per_field() {
        let mut config = base();
        config.schedule = Some(RawSchedule {
            start: "25:00".into(),
            end: "noon".into(),
        });

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::InvalidTimeFormat { .. })));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut config = base();
        config.unblock.max_attempts_per_hour = Some(0);
        config.unblock.challenge_timeout_seconds = Some(0);
        config.unblock.challenge_length = Some(0);
        config.enforcement.sweep_interval_ms = Some(10);
        config.enforcement.schedule_interval_seconds = Some(0);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn empty_flush_command_disables_flushing() {
        let mut config = base();
        config.resolver.flush_command = Some(vec![]);
        assert!(validate_config(&config).is_empty());

        config.resolver.flush_command = Some(vec!["".into()]);
        assert_eq!(validate_config(&config).len(), 1);
    }
}
