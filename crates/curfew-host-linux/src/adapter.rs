//! Linux host adapter implementation

use curfew_host_api::{HostAdapter, HostCapabilities, HostError, HostResult, ProcessInfo};
use tracing::{info, warn};

use crate::privilege::{is_root, relaunch_with};
use crate::process::{ProcessTable, kill_process};
use crate::resolver::{FLUSH_TIMEOUT, flush_resolver};

/// Linux host adapter
pub struct LinuxHost {
    capabilities: HostCapabilities,
    processes: ProcessTable,
    elevate_with: String,
    flush_command: Vec<String>,
}

impl LinuxHost {
    /// `elevate_with` is the helper used by [`HostAdapter::relaunch_elevated`];
    /// an empty `flush_command` disables resolver flushing.
    pub fn new(elevate_with: impl Into<String>, flush_command: Vec<String>) -> Self {
        let elevate_with = elevate_with.into();
        let capabilities = HostCapabilities {
            can_enumerate_processes: ProcessTable::is_supported(),
            can_kill_forcefully: true,
            can_relaunch_elevated: !elevate_with.is_empty(),
            can_flush_resolver: !flush_command.is_empty(),
        };

        info!(
            elevated = is_root(),
            elevate_with = %elevate_with,
            flush = ?flush_command,
            "Linux host adapter ready"
        );

        Self {
            capabilities,
            processes: ProcessTable::new(),
            elevate_with,
            flush_command,
        }
    }
}

impl Default for LinuxHost {
    fn default() -> Self {
        Self::new("sudo", vec!["resolvectl".into(), "flush-caches".into()])
    }
}

impl HostAdapter for LinuxHost {
    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    fn list_processes(&self) -> HostResult<Vec<ProcessInfo>> {
        self.processes.list()
    }

    fn terminate(&self, process: &ProcessInfo) -> HostResult<()> {
        if process.is_current() {
            return Err(HostError::TerminateFailed(
                "refusing to terminate the enforcing process".into(),
            ));
        }
        kill_process(process.pid)
    }

    fn is_elevated(&self) -> bool {
        is_root()
    }

    fn relaunch_elevated(&self) -> HostResult<()> {
        if is_root() {
            warn!("Relaunch requested but already running as root");
            return Ok(());
        }
        if !self.capabilities.can_relaunch_elevated {
            return Err(HostError::Unsupported);
        }
        Err(relaunch_with(&self.elevate_with))
    }

    fn flush_resolver_cache(&self) -> HostResult<()> {
        flush_resolver(&self.flush_command, FLUSH_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_processes_including_itself() {
        let host = LinuxHost::new("sudo", vec![]);
        let procs = host.list_processes().unwrap();
        assert!(procs.iter().any(ProcessInfo::is_current));
    }

    #[test]
    fn refuses_to_kill_itself() {
        let host = LinuxHost::default();
        let me = ProcessInfo::new(std::process::id(), "curfewd");
        assert!(matches!(host.terminate(&me), Err(HostError::TerminateFailed(_))));
    }

    #[test]
    fn capabilities_follow_configuration() {
        let bare = LinuxHost::new("", vec![]);
        assert!(!bare.capabilities().can_flush_resolver);
        assert!(!bare.capabilities().can_relaunch_elevated);
        assert!(bare.capabilities().can_enforce_apps());
        assert!(bare.flush_resolver_cache().is_ok());

        let full = LinuxHost::default();
        assert!(full.capabilities().can_flush_resolver);
        assert!(full.capabilities().can_relaunch_elevated);
    }
}
