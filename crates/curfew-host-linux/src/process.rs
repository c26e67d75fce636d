//! Process table access through sysinfo

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::ffi::OsStr;
use std::path::Path;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

use curfew_host_api::{HostError, HostResult, ProcessInfo};

/// `comm` is truncated to this many bytes by the kernel
const COMM_MAX_LEN: usize = 15;

/// Cached view of the OS process table, refreshed on every listing
pub struct ProcessTable {
    system: Mutex<System>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Whether processes can be listed on this platform at all
    pub fn is_supported() -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    /// Snapshot of every visible process
    pub fn list(&self) -> HostResult<Vec<ProcessInfo>> {
        if !Self::is_supported() {
            return Err(HostError::EnumerationFailed(
                "process listing is not supported on this system".into(),
            ));
        }

        let mut system = self.system.lock();
        // Executable paths recover names the kernel truncated
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            ProcessRefreshKind::new().with_exe(UpdateKind::Always),
        );

        let processes: Vec<ProcessInfo> = system
            .processes()
            .iter()
            .map(|(pid, process)| {
                ProcessInfo::new(pid.as_u32(), process_name(process.name(), process.exe()))
            })
            .collect();

        debug!(count = processes.len(), "Enumerated processes");
        Ok(processes)
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Display name for a process from its short name and executable path.
///
/// Short names at the kernel's length limit are replaced by the executable's
/// file name when that starts with the short name. The executable path does
/// not depend on argv, so programs that rewrite their arguments still
/// resolve to their full name.
pub fn process_name(name: &OsStr, exe: Option<&Path>) -> String {
    let short = name.to_string_lossy().into_owned();
    if short.len() < COMM_MAX_LEN {
        return short;
    }

    exe.and_then(Path::file_name)
        .map(|file| {
            let file = file.to_string_lossy();
            file.trim_end_matches(" (deleted)").to_string()
        })
        .filter(|full| full.starts_with(&short))
        .unwrap_or(short)
}

/// Send SIGKILL to a single process without waiting for it to exit
pub fn kill_process(pid: u32) -> HostResult<()> {
    let raw = i32::try_from(pid)
        .map_err(|_| HostError::TerminateFailed(format!("pid {} out of range", pid)))?;

    match signal::kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => {
            debug!(pid, "Sent SIGKILL");
            Ok(())
        }
        Err(Errno::ESRCH) => Err(HostError::ProcessGone(pid)),
        Err(Errno::EPERM) => Err(HostError::PermissionDenied(format!(
            "not allowed to signal pid {}",
            pid
        ))),
        Err(e) => Err(HostError::TerminateFailed(format!(
            "Failed to send SIGKILL to {}: {}",
            pid, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    fn name(short: &str, exe: Option<&str>) -> String {
        process_name(OsStr::new(short), exe.map(Path::new))
    }

    #[test]
    fn short_names_are_kept() {
        assert_eq!(name("steam", Some("/usr/bin/steam-runtime")), "steam");
        assert_eq!(name("python-launche", Some("/usr/bin/python3")), "python-launche");
    }

    #[test]
    fn truncated_name_uses_executable() {
        assert_eq!(
            name("signal-desktop-", Some("/opt/Signal/signal-desktop-beta")),
            "signal-desktop-beta"
        );
        // Binary replaced by an update while running
        assert_eq!(
            name("signal-desktop-", Some("/opt/Signal/signal-desktop-beta (deleted)")),
            "signal-desktop-beta"
        );
    }

    #[test]
    fn unrelated_or_missing_executable_is_ignored() {
        assert_eq!(name("abcdefghijklmno", Some("/usr/bin/python3")), "abcdefghijklmno");
        // Kernel threads have no executable
        assert_eq!(name("kworker/0:1-eve", None), "kworker/0:1-eve");
    }

    #[test]
    fn lists_current_process() {
        let table = ProcessTable::new();
        let procs = table.list().unwrap();
        assert!(procs.iter().any(|p| p.pid == std::process::id()));

        // A second refresh reuses the same table
        assert!(!table.list().unwrap().is_empty());
    }

    #[test]
    fn kill_child_then_report_gone() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();
        let pid = child.id();

        kill_process(pid).unwrap();
        let status = child.wait().unwrap();
        assert!(!status.success());

        // Reaped, so the pid no longer exists
        assert!(matches!(kill_process(pid), Err(HostError::ProcessGone(p)) if p == pid));
    }
}
