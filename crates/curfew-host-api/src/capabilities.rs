//! Host capabilities model

use serde::{Deserialize, Serialize};

/// Describes what a host adapter can do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Can list running processes
    pub can_enumerate_processes: bool,

    /// Can forcefully kill processes
    pub can_kill_forcefully: bool,

    /// Can restart itself with elevated privileges
    pub can_relaunch_elevated: bool,

    /// Can flush the name-resolution cache
    pub can_flush_resolver: bool,
}

impl HostCapabilities {
    /// Create minimal capabilities (process enumeration and kill only)
    pub fn minimal() -> Self {
        Self {
            can_enumerate_processes: true,
            can_kill_forcefully: true,
            can_relaunch_elevated: false,
            can_flush_resolver: false,
        }
    }

    /// Capabilities of a Linux host with an elevation helper and a resolver
    /// flush command
    pub fn linux_full() -> Self {
        Self {
            can_enumerate_processes: true,
            can_kill_forcefully: true,
            can_relaunch_elevated: true,
            can_flush_resolver: true,
        }
    }

    /// Whether the app blocklist can be enforced at all
    pub fn can_enforce_apps(&self) -> bool {
        self.can_enumerate_processes && self.can_kill_forcefully
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::minimal()
    }
}
