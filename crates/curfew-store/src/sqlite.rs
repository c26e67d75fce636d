//! SQLite-based audit store

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::debug;

use crate::{AuditEvent, AuditEventType, AuditStore, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    /// Delete events older than `cutoff`. Returns the number removed.
    pub fn prune_before(&self, cutoff: DateTime<Local>) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM audit_log WHERE timestamp < ?",
            [cutoff.to_rfc3339()],
        )?;
        debug!(removed, cutoff = %cutoff, "Audit log pruned");
        Ok(removed)
    }
}

impl AuditStore for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn.lock();
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| curfew_util::now());
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use curfew_util::ListKind;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_recent_audits(10).unwrap().is_empty());
    }

    #[test]
    fn test_audit_log_newest_first() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::Blocked {
                kind: ListKind::Website,
                name: "example.com".into(),
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].event,
            AuditEventType::Blocked {
                kind: ListKind::Website,
                name: "example.com".into()
            }
        );
        assert_eq!(events[1].event, AuditEventType::ServiceStarted);

        assert_eq!(store.get_recent_audits(1).unwrap().len(), 1);
    }

    #[test]
    fn test_prune_before() {
        let store = SqliteStore::in_memory().unwrap();
        let old = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let recent = Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        store
            .append_audit(AuditEvent::at(old, AuditEventType::EnforcementStarted))
            .unwrap();
        store
            .append_audit(AuditEvent::at(recent, AuditEventType::EnforcementEnded))
            .unwrap();

        let cutoff = Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(store.prune_before(cutoff).unwrap(), 1);

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, AuditEventType::EnforcementEnded);
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("audit.db");
        let store = SqliteStore::open(&path).unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
            .unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get_recent_audits(5).unwrap().len(), 1);
    }
}
