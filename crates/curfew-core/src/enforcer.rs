//! Process sweeps for blocked apps

use curfew_host_api::{HostAdapter, HostError, ProcessInfo};
use curfew_util::BlockedName;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A blocked process that could not be terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationFailure {
    pub process: ProcessInfo,
    pub error: String,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// False when the sweep was skipped because enforcement is idle
    pub ran: bool,
    pub examined: usize,
    pub terminated: Vec<ProcessInfo>,
    /// Matches that exited before they could be terminated
    pub vanished: usize,
    pub failures: Vec<TerminationFailure>,
    /// Set when the process table could not be read at all
    pub enumeration_error: Option<String>,
}

impl SweepReport {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.enumeration_error.is_none()
    }
}

/// Terminates running processes whose name is on the app blocklist
pub struct ProcessEnforcer {
    host: Arc<dyn HostAdapter>,
}

impl ProcessEnforcer {
    pub fn new(host: Arc<dyn HostAdapter>) -> Self {
        Self { host }
    }

    /// Terminate every running process matching `blocked`.
    ///
    /// Per-process failures are collected and the sweep carries on; the
    /// enforcing process itself is never a target.
    pub fn sweep(&self, blocked: &[BlockedName]) -> SweepReport {
        let mut report = SweepReport {
            ran: true,
            ..SweepReport::default()
        };

        if blocked.is_empty() {
            return report;
        }

        if !self.host.capabilities().can_enforce_apps() {
            debug!("Host cannot enumerate or kill processes, skipping sweep");
            report.enumeration_error =
                Some("process enforcement not supported by this host".into());
            return report;
        }

        let processes = match self.host.list_processes() {
            Ok(processes) => processes,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate processes");
                report.enumeration_error = Some(e.to_string());
                return report;
            }
        };
        report.examined = processes.len();

        let wanted: HashSet<String> = blocked.iter().map(|b| b.as_str().to_lowercase()).collect();

        for process in processes
            .iter()
            .filter(|p| wanted.contains(&p.match_key()))
        {
            if process.is_current() {
                continue;
            }

            match self.host.terminate(process) {
                Ok(()) => {
                    info!(pid = process.pid, name = %process.name, "Terminated blocked app");
                    report.terminated.push(process.clone());
                }
                Err(HostError::ProcessGone(pid)) => {
                    debug!(pid, name = %process.name, "Blocked app exited before termination");
                    report.vanished += 1;
                }
                Err(e) => {
                    warn!(
                        pid = process.pid,
                        name = %process.name,
                        error = %e,
                        "Failed to terminate blocked app"
                    );
                    report.failures.push(TerminationFailure {
                        process: process.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
