//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Daily blocking period. Defaults to 08:00-18:00.
    #[serde(default)]
    pub schedule: Option<RawSchedule>,

    #[serde(default)]
    pub enforcement: RawEnforcement,

    #[serde(default)]
    pub unblock: RawUnblock,

    #[serde(default)]
    pub resolver: RawResolver,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Directory for blocklists, the password file and the audit log
    pub data_dir: Option<PathBuf>,

    /// Hosts file to manage (default: the system hosts file)
    pub hosts_file: Option<PathBuf>,

    /// Helper used to relaunch with elevated privileges (default: "sudo")
    pub elevate_with: Option<String>,
}

/// Blocking period
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSchedule {
    /// Start time (HH:MM format), inclusive
    pub start: String,

    /// End time (HH:MM format), inclusive. May be earlier than `start`
    /// to wrap past midnight.
    pub end: String,
}

/// Enforcement cadence
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEnforcement {
    /// How often running processes are checked against the app blocklist
    pub sweep_interval_ms: Option<u64>,

    /// How often the schedule is re-evaluated
    pub schedule_interval_seconds: Option<u64>,
}

/// Unblock gate settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawUnblock {
    pub max_attempts_per_hour: Option<u32>,

    /// Time allowed to answer the challenge, after the memorize phase
    pub challenge_timeout_seconds: Option<u64>,

    /// How long the challenge text stays on screen
    pub memorize_seconds: Option<u64>,

    /// Length of the random text to memorize
    pub challenge_length: Option<usize>,
}

/// Resolver cache flushing after hosts file changes
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawResolver {
    /// Command and arguments. An empty list disables flushing.
    pub flush_command: Option<Vec<String>>,
}
