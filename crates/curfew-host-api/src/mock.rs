//! Mock host adapter for testing

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::{HostAdapter, HostCapabilities, HostError, HostResult, ProcessInfo};

/// Mock host adapter for unit/integration testing
///
/// Keeps an in-memory process table. Terminated processes disappear from the
/// table and are recorded for inspection.
pub struct MockHost {
    capabilities: HostCapabilities,
    next_pid: AtomicU32,
    processes: Arc<Mutex<Vec<ProcessInfo>>>,
    terminated: Arc<Mutex<Vec<ProcessInfo>>>,
    flushes: AtomicUsize,
    relaunches: AtomicUsize,

    /// Whether the process is considered elevated
    pub elevated: Arc<Mutex<bool>>,

    /// Configure process enumeration to fail
    pub fail_list: Arc<Mutex<bool>>,

    /// Configure the resolver flush to fail
    pub fail_flush: Arc<Mutex<bool>>,

    /// Processes that refuse termination (protected system processes)
    pub protected: Arc<Mutex<HashSet<u32>>>,
}

impl MockHost {
    /// An elevated host with an empty process table
    pub fn new() -> Self {
        Self {
            capabilities: HostCapabilities::linux_full(),
            next_pid: AtomicU32::new(1000),
            processes: Arc::new(Mutex::new(Vec::new())),
            terminated: Arc::new(Mutex::new(Vec::new())),
            flushes: AtomicUsize::new(0),
            relaunches: AtomicUsize::new(0),
            elevated: Arc::new(Mutex::new(true)),
            fail_list: Arc::new(Mutex::new(false)),
            fail_flush: Arc::new(Mutex::new(false)),
            protected: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_capabilities(mut self, caps: HostCapabilities) -> Self {
        self.capabilities = caps;
        self
    }

    /// Add a process to the table and return its pid
    pub fn spawn_process(&self, name: &str) -> u32 {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.processes.lock().push(ProcessInfo::new(pid, name));
        pid
    }

    /// Add a process with a fixed pid (e.g. the test's own pid)
    pub fn insert_process(&self, process: ProcessInfo) {
        self.processes.lock().push(process);
    }

    /// Simulate a process exiting on its own
    pub fn exit_process(&self, pid: u32) {
        self.processes.lock().retain(|p| p.pid != pid);
    }

    pub fn running(&self) -> Vec<ProcessInfo> {
        self.processes.lock().clone()
    }

    pub fn terminated(&self) -> Vec<ProcessInfo> {
        self.terminated.lock().clone()
    }

    pub fn set_elevated(&self, elevated: bool) {
        *self.elevated.lock() = elevated;
    }

    pub fn protect(&self, pid: u32) {
        self.protected.lock().insert(pid);
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn relaunch_count(&self) -> usize {
        self.relaunches.load(Ordering::SeqCst)
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for MockHost {
    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    fn list_processes(&self) -> HostResult<Vec<ProcessInfo>> {
        if *self.fail_list.lock() {
            return Err(HostError::EnumerationFailed("Mock enumeration failure".into()));
        }
        Ok(self.running())
    }

    fn terminate(&self, process: &ProcessInfo) -> HostResult<()> {
        if self.protected.lock().contains(&process.pid) {
            return Err(HostError::PermissionDenied(format!(
                "{} is protected",
                process
            )));
        }

        let mut processes = self.processes.lock();
        let Some(index) = processes.iter().position(|p| p.pid == process.pid) else {
            return Err(HostError::ProcessGone(process.pid));
        };
        let removed = processes.remove(index);
        self.terminated.lock().push(removed);
        Ok(())
    }

    fn is_elevated(&self) -> bool {
        *self.elevated.lock()
    }

    fn relaunch_elevated(&self) -> HostResult<()> {
        self.relaunches.fetch_add(1, Ordering::SeqCst);
        self.set_elevated(true);
        Ok(())
    }

    fn flush_resolver_cache(&self) -> HostResult<()> {
        if *self.fail_flush.lock() {
            return Err(HostError::CommandFailed("Mock flush failure".into()));
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_terminate_removes_process() {
        let host = MockHost::new();
        let pid = host.spawn_process("steam");
        let process = ProcessInfo::new(pid, "steam");

        host.terminate(&process).unwrap();
        assert!(host.running().is_empty());
        assert_eq!(host.terminated(), vec![process.clone()]);

        // Second kill finds nothing
        assert!(matches!(host.terminate(&process), Err(HostError::ProcessGone(p)) if p == pid));
    }

    #[test]
    fn mock_protected_process_refuses() {
        let host = MockHost::new();
        let pid = host.spawn_process("init");
        host.protect(pid);

        let result = host.terminate(&ProcessInfo::new(pid, "init"));
        assert!(matches!(result, Err(HostError::PermissionDenied(_))));
        assert_eq!(host.running().len(), 1);
    }

    #[test]
    fn mock_failure_toggles() {
        let host = MockHost::new();
        *host.fail_list.lock() = true;
        assert!(host.list_processes().is_err());

        *host.fail_flush.lock() = true;
        assert!(host.flush_resolver_cache().is_err());
        assert_eq!(host.flush_count(), 0);
    }

    #[test]
    fn mock_relaunch_elevates() {
        let host = MockHost::new();
        host.set_elevated(false);
        assert!(!host.is_elevated());

        host.relaunch_elevated().unwrap();
        assert!(host.is_elevated());
        assert_eq!(host.relaunch_count(), 1);
    }
}
