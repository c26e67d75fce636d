//! Enforcement engine

use chrono::{DateTime, Local, NaiveDateTime};
use curfew_config::Policy;
use curfew_host_api::HostAdapter;
use curfew_store::{AuditEvent, AuditEventType, AuditStore, BlockListStore, StoreError};
use curfew_util::{BlockedName, CurfewError, ListKind, Result, ScheduleWindow};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    AttemptDecision, AuthOutcome, Authenticator, ChallengeOutcome, Challenger, CoreEvent,
    EnforcementState, HostsFile, ProcessEnforcer, ResyncReport, ScheduleOracle, SweepReport,
    UnblockGate,
};

/// Result of a block request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Blocked(BlockedName),
    AlreadyBlocked(BlockedName),
    /// The name was not acceptable; nothing changed
    Rejected(String),
}

/// Why an unblock request was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnblockDenial {
    AuthenticationFailed,
    RateLimited {
        max_per_hour: u32,
        retry_at: NaiveDateTime,
    },
    ChallengeFailed,
    ChallengeTimedOut,
}

impl fmt::Display for UnblockDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnblockDenial::AuthenticationFailed => write!(f, "incorrect password"),
            UnblockDenial::RateLimited {
                max_per_hour,
                retry_at,
            } => write!(
                f,
                "limit of {} unblock attempts per hour reached, try again after {}",
                max_per_hour,
                retry_at.format("%H:%M")
            ),
            UnblockDenial::ChallengeFailed => write!(f, "challenge failed"),
            UnblockDenial::ChallengeTimedOut => write!(f, "challenge timed out"),
        }
    }
}

/// Result of an unblock request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnblockOutcome {
    Unblocked(BlockedName),
    NotBlocked(String),
    Denied(UnblockDenial),
}

/// Point-in-time view of the engine for status displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub state: EnforcementState,
    pub window: ScheduleWindow,
    /// Time left in the blocking period, when enforcing
    pub ends_in: Option<Duration>,
    /// Time until the next blocking period, when idle
    pub resumes_in: Option<Duration>,
    pub websites: usize,
    pub apps: usize,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub password_set: bool,
    pub elevated: bool,
    /// The hosts file does not yet reflect the website list
    pub hosts_pending: bool,
}

#[derive(Debug, Default)]
struct EngineState {
    current: Option<EnforcementState>,
    hosts_pending: bool,
}

/// Owns the blocklists and drives every enforcement mechanism from them.
///
/// All methods take `&self`; an unblock can wait on the challenge for a
/// long time while sweeps and ticks keep running on other threads.
pub struct EnforcementEngine {
    policy: Policy,
    oracle: ScheduleOracle,
    lists: Arc<BlockListStore>,
    hosts: HostsFile,
    enforcer: ProcessEnforcer,
    gate: UnblockGate,
    host: Arc<dyn HostAdapter>,
    auth: Arc<dyn Authenticator>,
    audit: Arc<dyn AuditStore>,
    state: Mutex<EngineState>,
}

impl EnforcementEngine {
    pub fn new(
        policy: Policy,
        lists: Arc<BlockListStore>,
        host: Arc<dyn HostAdapter>,
        auth: Arc<dyn Authenticator>,
        challenger: Arc<dyn Challenger>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        info!(
            schedule = %policy.schedule,
            websites = lists.len(ListKind::Website),
            apps = lists.len(ListKind::App),
            hosts_file = %policy.service.hosts_file.display(),
            "Enforcement engine initialized"
        );

        let _ = audit.append_audit(AuditEvent::new(AuditEventType::PolicyLoaded {
            schedule: policy.schedule.to_string(),
        }));

        Self {
            oracle: ScheduleOracle::new(policy.schedule),
            hosts: HostsFile::new(&policy.service.hosts_file, host.clone()),
            enforcer: ProcessEnforcer::new(host.clone()),
            gate: UnblockGate::new(&policy.unblock, challenger),
            policy,
            lists,
            host,
            auth,
            audit,
            state: Mutex::new(EngineState::default()),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Apply the website list and evaluate the schedule for the first time
    pub fn start(&self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        if let Some(event) = self.resync_hosts(now) {
            events.push(event);
        }
        events.extend(self.tick(now));
        events
    }

    /// Schedule check: emit transitions and heal the hosts file.
    ///
    /// The hosts file is re-applied while enforcing (to undo outside edits)
    /// and whenever an earlier write failed.
    pub fn tick(&self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let next = self.oracle.state_at(&now);
        let (previous, pending) = {
            let mut state = self.state.lock();
            (state.current.replace(next), state.hosts_pending)
        };

        let mut events = Vec::new();

        if previous != Some(next) {
            events.push(self.transition(next, previous, now));
        }

        if (next == EnforcementState::Enforcing || pending)
            && let Some(event) = self.resync_hosts(now)
        {
            events.push(event);
        }

        events
    }

    fn transition(
        &self,
        next: EnforcementState,
        previous: Option<EnforcementState>,
        now: DateTime<Local>,
    ) -> CoreEvent {
        let window = self.oracle.window();
        match next {
            EnforcementState::Enforcing => {
                info!(window = %window, "Blocking period active");
                let _ = self
                    .audit
                    .append_audit(AuditEvent::at(now, AuditEventType::EnforcementStarted));
                CoreEvent::EnforcementStarted {
                    ends_in: window.remaining(&now),
                }
            }
            EnforcementState::Idle => {
                info!(window = %window, "Blocking period not active");
                // Only an actual end of enforcement is worth recording
                if previous == Some(EnforcementState::Enforcing) {
                    let _ = self
                        .audit
                        .append_audit(AuditEvent::at(now, AuditEventType::EnforcementEnded));
                }
                CoreEvent::EnforcementEnded {
                    resumes_in: window.until_start(&now),
                }
            }
        }
    }

    /// Terminate blocked apps if the blocking period is active at `now`
    pub fn sweep(&self, now: DateTime<Local>) -> SweepReport {
        if !self.oracle.is_active(&now) {
            return SweepReport::skipped();
        }

        let report = self.enforcer.sweep(&self.lists.snapshot(ListKind::App));

        for process in &report.terminated {
            let _ = self.audit.append_audit(AuditEvent::at(
                now,
                AuditEventType::ProcessTerminated {
                    name: process.name.clone(),
                    pid: process.pid,
                },
            ));
        }

        report
    }

    pub fn is_enforcing(&self, now: DateTime<Local>) -> bool {
        self.oracle.is_active(&now)
    }

    pub fn blocked(&self, kind: ListKind) -> Vec<BlockedName> {
        self.lists.snapshot(kind)
    }

    /// Add `raw` to a blocklist. Allowed at any time and without a password.
    ///
    /// Blocking a website requires elevation because it rewrites the hosts
    /// file. If that rewrite fails the entry stays blocked and the error is
    /// returned; the next tick retries.
    pub fn block(&self, kind: ListKind, raw: &str, now: DateTime<Local>) -> Result<BlockOutcome> {
        let name = match BlockedName::parse(kind, raw) {
            Ok(name) => name,
            Err(e) => {
                debug!(kind = %kind, raw, error = %e, "Rejected block request");
                return Ok(BlockOutcome::Rejected(e.to_string()));
            }
        };

        if kind == ListKind::Website && !self.host.is_elevated() {
            return Err(CurfewError::permission(
                "blocking websites needs administrator rights to edit the hosts file",
            ));
        }

        if !self.lists.add(kind, name.clone()).map_err(store_error)? {
            return Ok(BlockOutcome::AlreadyBlocked(name));
        }

        info!(kind = %kind, name = %name, "Blocked");
        let _ = self.audit.append_audit(AuditEvent::at(
            now,
            AuditEventType::Blocked {
                kind,
                name: name.to_string(),
            },
        ));

        if kind == ListKind::Website {
            self.apply_websites(now)?;
        }

        Ok(BlockOutcome::Blocked(name))
    }

    /// Remove `raw` from a blocklist, subject to the unblock gate.
    ///
    /// Checks run in a fixed order: privilege (websites), membership,
    /// password, hourly attempt limit, challenge. An attempt is only counted
    /// once the password is accepted.
    pub fn unblock(
        &self,
        kind: ListKind,
        raw: &str,
        password: &str,
        now: DateTime<Local>,
    ) -> Result<UnblockOutcome> {
        let Ok(name) = BlockedName::parse(kind, raw) else {
            return Ok(UnblockOutcome::NotBlocked(raw.trim().to_string()));
        };

        if kind == ListKind::Website && !self.host.is_elevated() {
            return Err(CurfewError::permission(
                "unblocking websites needs administrator rights to edit the hosts file",
            ));
        }

        if !self.lists.contains(kind, &name) {
            return Ok(UnblockOutcome::NotBlocked(name.to_string()));
        }

        if self.auth.authenticate(password) == AuthOutcome::Rejected {
            return Ok(self.deny(kind, &name, UnblockDenial::AuthenticationFailed, now));
        }

        match self.gate.try_consume_attempt(&now) {
            AttemptDecision::Permitted { remaining } => {
                debug!(kind = %kind, name = %name, remaining, "Unblock attempt permitted");
            }
            AttemptDecision::Denied { retry_at } => {
                let denial = UnblockDenial::RateLimited {
                    max_per_hour: self.gate.max_per_hour(),
                    retry_at,
                };
                return Ok(self.deny(kind, &name, denial, now));
            }
        }

        match self.gate.require_challenge() {
            ChallengeOutcome::Passed => {}
            ChallengeOutcome::Failed => {
                return Ok(self.deny(kind, &name, UnblockDenial::ChallengeFailed, now));
            }
            ChallengeOutcome::TimedOut => {
                return Ok(self.deny(kind, &name, UnblockDenial::ChallengeTimedOut, now));
            }
        }

        if !self.lists.remove(kind, &name).map_err(store_error)? {
            // Removed by someone else while the challenge was open
            return Ok(UnblockOutcome::NotBlocked(name.to_string()));
        }

        info!(kind = %kind, name = %name, "Unblocked");
        let _ = self.audit.append_audit(AuditEvent::at(
            now,
            AuditEventType::Unblocked {
                kind,
                name: name.to_string(),
            },
        ));

        if kind == ListKind::Website {
            self.apply_websites(now)?;
        }

        Ok(UnblockOutcome::Unblocked(name))
    }

    fn deny(
        &self,
        kind: ListKind,
        name: &BlockedName,
        denial: UnblockDenial,
        now: DateTime<Local>,
    ) -> UnblockOutcome {
        info!(kind = %kind, name = %name, reason = %denial, "Unblock denied");
        let _ = self.audit.append_audit(AuditEvent::at(
            now,
            AuditEventType::UnblockDenied {
                kind,
                name: name.to_string(),
                reason: denial.to_string(),
            },
        ));
        UnblockOutcome::Denied(denial)
    }

    /// Re-read both blocklists from disk and re-apply the website list
    pub fn reload_lists(&self, now: DateTime<Local>) -> Result<Vec<CoreEvent>> {
        self.lists.reload().map_err(store_error)?;

        let websites = self.lists.len(ListKind::Website);
        let apps = self.lists.len(ListKind::App);
        info!(websites, apps, "Blocklists reloaded");
        let _ = self.audit.append_audit(AuditEvent::at(
            now,
            AuditEventType::ListsReloaded { websites, apps },
        ));

        let mut events: Vec<CoreEvent> = ListKind::ALL
            .iter()
            .map(|&kind| CoreEvent::BlocklistChanged {
                kind,
                entries: self.lists.len(kind),
            })
            .collect();

        if let Some(event) = self.resync_hosts(now) {
            events.push(event);
        }

        Ok(events)
    }

    pub fn requires_password(&self) -> bool {
        self.auth.has_credential()
    }

    /// Change or clear (`new == None`) the unblock password.
    ///
    /// Returns `false` without changing anything if `current` is wrong.
    pub fn change_password(
        &self,
        current: &str,
        new: Option<&str>,
        now: DateTime<Local>,
    ) -> Result<bool> {
        if self.auth.authenticate(current) == AuthOutcome::Rejected {
            warn!("Password change refused: current password incorrect");
            return Ok(false);
        }

        if new.is_some_and(str::is_empty) {
            return Err(CurfewError::validation("password must not be empty"));
        }

        self.auth.update_credential(new)?;
        let _ = self.audit.append_audit(AuditEvent::at(
            now,
            AuditEventType::PasswordChanged {
                cleared: new.is_none(),
            },
        ));
        Ok(true)
    }

    /// Most recent audit entries, newest first
    pub fn recent_audits(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        self.audit.get_recent_audits(limit).map_err(store_error)
    }

    pub fn is_elevated(&self) -> bool {
        self.host.is_elevated()
    }

    pub fn can_relaunch_elevated(&self) -> bool {
        self.host.capabilities().can_relaunch_elevated
    }

    /// Ask the host to restart this program with elevated privileges
    pub fn relaunch_elevated(&self) -> Result<()> {
        self.host
            .relaunch_elevated()
            .map_err(|e| CurfewError::host(e.to_string()))
    }

    pub fn status(&self, now: DateTime<Local>) -> EngineStatus {
        let window = *self.oracle.window();
        EngineStatus {
            state: self.oracle.state_at(&now),
            window,
            ends_in: window.remaining(&now),
            resumes_in: window.until_start(&now),
            websites: self.lists.len(ListKind::Website),
            apps: self.lists.len(ListKind::App),
            attempts_used: self.gate.attempts_used(&now),
            max_attempts: self.gate.max_per_hour(),
            password_set: self.auth.has_credential(),
            elevated: self.host.is_elevated(),
            hosts_pending: self.state.lock().hosts_pending,
        }
    }

    /// Write the current website list to the hosts file, tracking whether
    /// the file is out of date.
    ///
    /// The list is read under the hosts file lock, so the last write always
    /// carries the newest list.
    fn apply_websites(&self, now: DateTime<Local>) -> Result<ResyncReport> {
        let result = self
            .hosts
            .resync_with(|| self.lists.snapshot(ListKind::Website));

        let was_pending = {
            let mut state = self.state.lock();
            let was = state.hosts_pending;
            state.hosts_pending = result.is_err();
            was
        };

        match &result {
            Ok(report) if report.changed => {
                let _ = self.audit.append_audit(AuditEvent::at(
                    now,
                    AuditEventType::HostsResynced {
                        managed_lines: report.managed_lines,
                    },
                ));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Failed to apply website blocklist to hosts file");
                if !was_pending {
                    let _ = self.audit.append_audit(AuditEvent::at(
                        now,
                        AuditEventType::HostsResyncFailed {
                            error: e.to_string(),
                        },
                    ));
                }
            }
        }

        result
    }

    fn resync_hosts(&self, now: DateTime<Local>) -> Option<CoreEvent> {
        match self.apply_websites(now) {
            Ok(report) if report.changed => Some(CoreEvent::HostsResynced {
                managed_lines: report.managed_lines,
            }),
            _ => None,
        }
    }
}

fn store_error(e: StoreError) -> CurfewError {
    CurfewError::store(e.to_string())
}
