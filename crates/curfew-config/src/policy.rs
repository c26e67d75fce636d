//! Validated policy structures

use crate::schema::{RawConfig, RawEnforcement, RawResolver, RawServiceConfig, RawUnblock};
use crate::validation::parse_time;
use curfew_util::{ScheduleWindow, WallClock, default_data_dir, default_hosts_path};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_SCHEDULE_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS_PER_HOUR: u32 = 2;
pub const DEFAULT_CHALLENGE_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_MEMORIZE_SECONDS: u64 = 10;
pub const DEFAULT_CHALLENGE_LENGTH: usize = 20;
pub const DEFAULT_ELEVATE_WITH: &str = "sudo";

/// Validated policy ready for use by the enforcement engine
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub service: ServiceConfig,

    /// Daily blocking period
    pub schedule: ScheduleWindow,

    pub enforcement: EnforcementPolicy,

    pub unblock: UnblockPolicy,

    pub resolver: ResolverPolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let schedule = raw
            .schedule
            .map(|s| ScheduleWindow::new(convert_time(&s.start), convert_time(&s.end)))
            .unwrap_or_default();

        Self {
            service: ServiceConfig::from_raw(raw.service),
            schedule,
            enforcement: EnforcementPolicy::from_raw(raw.enforcement),
            unblock: UnblockPolicy::from_raw(raw.unblock),
            resolver: ResolverPolicy::from_raw(raw.resolver),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub hosts_file: PathBuf,
    pub elevate_with: String,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            hosts_file: raw.hosts_file.unwrap_or_else(default_hosts_path),
            elevate_with: raw
                .elevate_with
                .unwrap_or_else(|| DEFAULT_ELEVATE_WITH.to_string()),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            hosts_file: default_hosts_path(),
            elevate_with: DEFAULT_ELEVATE_WITH.to_string(),
        }
    }
}

/// How often the periodic enforcement activities run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementPolicy {
    pub sweep_interval: Duration,
    pub schedule_interval: Duration,
}

impl EnforcementPolicy {
    fn from_raw(raw: RawEnforcement) -> Self {
        Self {
            sweep_interval: Duration::from_millis(
                raw.sweep_interval_ms.unwrap_or(DEFAULT_SWEEP_INTERVAL_MS),
            ),
            schedule_interval: Duration::from_secs(
                raw.schedule_interval_seconds
                    .unwrap_or(DEFAULT_SCHEDULE_INTERVAL_SECONDS),
            ),
        }
    }
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self::from_raw(RawEnforcement::default())
    }
}

/// Limits on removing entries from a blocklist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnblockPolicy {
    pub max_attempts_per_hour: u32,
    /// Time allowed to answer once the memorize phase is over
    pub challenge_timeout: Duration,
    pub memorize_for: Duration,
    pub challenge_length: usize,
}

impl UnblockPolicy {
    fn from_raw(raw: RawUnblock) -> Self {
        Self {
            max_attempts_per_hour: raw
                .max_attempts_per_hour
                .unwrap_or(DEFAULT_MAX_ATTEMPTS_PER_HOUR),
            challenge_timeout: Duration::from_secs(
                raw.challenge_timeout_seconds
                    .unwrap_or(DEFAULT_CHALLENGE_TIMEOUT_SECONDS),
            ),
            memorize_for: Duration::from_secs(
                raw.memorize_seconds.unwrap_or(DEFAULT_MEMORIZE_SECONDS),
            ),
            challenge_length: raw.challenge_length.unwrap_or(DEFAULT_CHALLENGE_LENGTH),
        }
    }

    /// Upper bound on the whole challenge interaction
    pub fn challenge_budget(&self) -> Duration {
        self.memorize_for + self.challenge_timeout
    }
}

impl Default for UnblockPolicy {
    fn default() -> Self {
        Self::from_raw(RawUnblock::default())
    }
}

/// Resolver cache flushing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// Empty means flushing is disabled
    pub flush_command: Vec<String>,
}

impl ResolverPolicy {
    fn from_raw(raw: RawResolver) -> Self {
        Self {
            flush_command: raw.flush_command.unwrap_or_else(default_flush_command),
        }
    }
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            flush_command: default_flush_command(),
        }
    }
}

fn default_flush_command() -> Vec<String> {
    vec!["resolvectl".to_string(), "flush-caches".to_string()]
}

fn convert_time(s: &str) -> WallClock {
    let (h, m) = parse_time(s).unwrap_or((0, 0));
    WallClock::new(h, m).unwrap_or(WallClock::MIDNIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let policy = Policy::default();
        assert_eq!(policy.schedule.to_string(), "08:00-18:00");
        assert_eq!(policy.enforcement.sweep_interval, Duration::from_secs(2));
        assert_eq!(policy.enforcement.schedule_interval, Duration::from_secs(30));
        assert_eq!(policy.unblock.max_attempts_per_hour, 2);
        assert_eq!(policy.unblock.challenge_budget(), Duration::from_secs(70));
        assert_eq!(policy.unblock.challenge_length, 20);
        assert_eq!(policy.resolver.flush_command, vec!["resolvectl", "flush-caches"]);
        assert_eq!(policy.service.elevate_with, "sudo");
    }

    #[test]
    fn schedule_is_converted() {
        let raw: RawConfig = toml::from_str(
            r#"
            config_version = 1
            [schedule]
            start = "04:00"
            end = "00:00"
            "#,
        )
        .unwrap();

        let policy = Policy::from_raw(raw);
        assert_eq!(policy.schedule.start, WallClock::new(4, 0).unwrap());
        assert_eq!(policy.schedule.end, WallClock::MIDNIGHT);
        assert!(policy.schedule.wraps_midnight());
    }
}
