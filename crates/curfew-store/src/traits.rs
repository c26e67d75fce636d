//! Store trait definitions

use crate::{AuditEvent, StoreResult};

/// Append-only audit log
pub trait AuditStore: Send + Sync {
    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Most recent events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;
}
