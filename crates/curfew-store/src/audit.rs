//! Audit event types

use chrono::{DateTime, Local};
use curfew_util::ListKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    ServiceStarted,

    ServiceStopped,

    /// Policy loaded at startup
    PolicyLoaded { schedule: String },

    /// The blocking period began
    EnforcementStarted,

    /// The blocking period ended
    EnforcementEnded,

    Blocked { kind: ListKind, name: String },

    Unblocked { kind: ListKind, name: String },

    /// An unblock request was refused by the gate
    UnblockDenied {
        kind: ListKind,
        name: String,
        reason: String,
    },

    /// A blocked app was killed during the blocking period
    ProcessTerminated { name: String, pid: u32 },

    /// The hosts file was rewritten
    HostsResynced { managed_lines: usize },

    /// Applying the website list to the hosts file failed
    HostsResyncFailed { error: String },

    /// Blocklists re-read from disk
    ListsReloaded { websites: usize, apps: usize },

    PasswordChanged { cleared: bool },
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceStarted => write!(f, "service started"),
            Self::ServiceStopped => write!(f, "service stopped"),
            Self::PolicyLoaded { schedule } => write!(f, "policy loaded (blocking {})", schedule),
            Self::EnforcementStarted => write!(f, "blocking period started"),
            Self::EnforcementEnded => write!(f, "blocking period ended"),
            Self::Blocked { kind, name } => write!(f, "blocked {} {}", kind, name),
            Self::Unblocked { kind, name } => write!(f, "unblocked {} {}", kind, name),
            Self::UnblockDenied { kind, name, reason } => {
                write!(f, "unblock of {} {} denied: {}", kind, name, reason)
            }
            Self::ProcessTerminated { name, pid } => {
                write!(f, "terminated {} (pid {})", name, pid)
            }
            Self::HostsResynced { managed_lines } => {
                write!(f, "hosts file updated ({} managed lines)", managed_lines)
            }
            Self::HostsResyncFailed { error } => write!(f, "hosts file update failed: {}", error),
            Self::ListsReloaded { websites, apps } => {
                write!(f, "blocklists reloaded ({} websites, {} apps)", websites, apps)
            }
            Self::PasswordChanged { cleared: true } => write!(f, "password cleared"),
            Self::PasswordChanged { cleared: false } => write!(f, "password changed"),
        }
    }
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Row ID, set by the store
    pub id: i64,

    pub timestamp: DateTime<Local>,

    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(curfew_util::now(), event)
    }

    pub fn at(timestamp: DateTime<Local>, event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp,
            event,
        }
    }
}
