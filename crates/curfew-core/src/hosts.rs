//! Hosts file synchronization
//!
//! Blocked websites are applied by pointing them at the loopback address in
//! the system hosts file. Every line curfew writes carries [`HOSTS_MARKER`];
//! lines without it belong to someone else and are never touched.

use curfew_host_api::HostAdapter;
use curfew_store::{AtomicWriteError, write_atomic};
use curfew_util::{BlockedName, CurfewError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tag identifying lines managed by curfew
pub const HOSTS_MARKER: &str = "Blocked by curfew";

/// Address blocked names resolve to
pub const BLOCK_ADDRESS: &str = "127.0.0.1";

/// Hosts entries for `websites`, bare and `www.` forms, without duplicates
pub fn managed_lines(websites: &[BlockedName]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for site in websites {
        let bare = site.as_str().to_lowercase();
        let www = format!("www.{}", bare);

        for host in [bare, www] {
            if seen.insert(host.clone()) {
                lines.push(format!("{} {} # {}", BLOCK_ADDRESS, host, HOSTS_MARKER));
            }
        }
    }

    lines
}

/// Split `content` into lines without their `\n` or `\r\n` terminator
fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix(b"\n").unwrap_or(content);
    body.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

fn is_managed(line: &[u8]) -> bool {
    let marker = HOSTS_MARKER.as_bytes();
    line.windows(marker.len()).any(|w| w == marker)
}

/// Render the hosts file content for `websites` on top of `existing`.
///
/// Foreign lines keep their order and bytes, so comments in a legacy
/// encoding survive. Managed lines are dropped and re-appended at the end.
/// The existing line ending style is preserved.
pub fn render_hosts(existing: &[u8], websites: &[BlockedName]) -> Vec<u8> {
    let crlf = existing.windows(2).any(|w| w == b"\r\n");
    let newline: &[u8] = if crlf { b"\r\n" } else { b"\n" };
    let mut out = Vec::with_capacity(existing.len());

    for line in split_lines(existing).into_iter().filter(|l| !is_managed(l)) {
        out.extend_from_slice(line);
        out.extend_from_slice(newline);
    }

    for line in managed_lines(websites) {
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(newline);
    }

    out
}

/// Result of a successful [`HostsFile::resync`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncReport {
    /// Whether the file content changed
    pub changed: bool,
    pub managed_lines: usize,
    /// Whether the resolver cache was flushed afterwards
    pub flushed: bool,
}

/// The system hosts file, rewritten from the website blocklist
pub struct HostsFile {
    path: PathBuf,
    host: Arc<dyn HostAdapter>,
    // Serializes read-modify-write cycles from this process
    lock: Mutex<()>,
}

impl HostsFile {
    pub fn new(path: impl Into<PathBuf>, host: Arc<dyn HostAdapter>) -> Self {
        Self {
            path: path.into(),
            host,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make the managed section match `websites` exactly.
    pub fn resync(&self, websites: &[BlockedName]) -> Result<ResyncReport> {
        self.resync_with(|| websites.to_vec())
    }

    /// Like [`HostsFile::resync`], but the list is fetched by `current`
    /// while the file lock is held, so a resync can never write a list
    /// older than the one a concurrent resync already wrote.
    ///
    /// Nothing is written (and the resolver is not flushed) when the file
    /// already matches. A failed flush is logged but does not fail the
    /// resync.
    pub fn resync_with(
        &self,
        current: impl FnOnce() -> Vec<BlockedName>,
    ) -> Result<ResyncReport> {
        let _guard = self.lock.lock();
        let websites = current();

        let existing = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) => return Err(CurfewError::from_io(&self.context("reading"), &e)),
        };

        let rendered = render_hosts(&existing, &websites);
        let managed = managed_lines(&websites).len();

        if rendered == existing {
            debug!(path = %self.path.display(), managed, "Hosts file already up to date");
            return Ok(ResyncReport {
                changed: false,
                managed_lines: managed,
                flushed: false,
            });
        }

        self.write(&rendered)?;

        let flushed = if !self.host.capabilities().can_flush_resolver {
            false
        } else {
            match self.host.flush_resolver_cache() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Failed to flush resolver cache after hosts update");
                    false
                }
            }
        };

        info!(
            path = %self.path.display(),
            managed_lines = managed,
            flushed,
            "Hosts file updated"
        );

        Ok(ResyncReport {
            changed: true,
            managed_lines: managed,
            flushed,
        })
    }

    fn write(&self, content: &[u8]) -> Result<()> {
        match write_atomic(&self.path, content) {
            Ok(()) => Ok(()),
            // Some systems bind-mount the hosts file, so it cannot be
            // renamed over. Fall back to rewriting it in place.
            Err(AtomicWriteError::Replace { source, .. })
                if source.kind() != io::ErrorKind::PermissionDenied =>
            {
                warn!(
                    path = %self.path.display(),
                    error = %source,
                    "Atomic replace failed, rewriting hosts file in place"
                );
                fs::write(&self.path, content)
                    .map_err(|e| CurfewError::from_io(&self.context("writing"), &e))
            }
            Err(e) => Err(CurfewError::from_io(&self.context("writing"), e.io_error())),
        }
    }

    fn context(&self, action: &str) -> String {
        format!("{} {}", action, self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curfew_host_api::{HostCapabilities, MockHost};
    use curfew_util::ListKind;

    fn sites(names: &[&str]) -> Vec<BlockedName> {
        names
            .iter()
            .map(|n| BlockedName::parse(ListKind::Website, n).unwrap())
            .collect()
    }

    fn render(existing: &str, websites: &[BlockedName]) -> String {
        String::from_utf8(render_hosts(existing.as_bytes(), websites)).unwrap()
    }

    const BASE: &str = "127.0.0.1 localhost\n::1 localhost\n# custom\n10.0.0.5 nas.lan\n";

    #[test]
    fn render_appends_both_forms() {
        let out = render(BASE, &sites(&["reddit.com"]));
        assert!(out.starts_with(BASE));
        assert!(out.contains("127.0.0.1 reddit.com # Blocked by curfew\n"));
        assert!(out.contains("127.0.0.1 www.reddit.com # Blocked by curfew\n"));
    }

    #[test]
    fn render_is_idempotent() {
        let list = sites(&["reddit.com", "news.ycombinator.com"]);
        let once = render(BASE, &list);
        let twice = render(&once, &list);
        assert_eq!(once, twice);
    }

    #[test]
    fn render_with_empty_list_restores_foreign_lines() {
        let blocked = render(BASE, &sites(&["reddit.com"]));
        assert_eq!(render(&blocked, &[]), BASE);
        assert_eq!(render("", &[]), "");
    }

    #[test]
    fn render_removes_unblocked_entries_only() {
        let both = render(BASE, &sites(&["reddit.com", "youtube.com"]));
        let one = render(&both, &sites(&["youtube.com"]));
        assert!(!one.contains("reddit.com"));
        assert!(one.contains("127.0.0.1 youtube.com # Blocked by curfew"));
        assert!(one.contains("nas.lan"));
    }

    #[test]
    fn render_preserves_crlf() {
        let base = "127.0.0.1 localhost\r\n";
        let out = render(base, &sites(&["reddit.com"]));
        assert!(out.starts_with(base));
        assert!(out.ends_with("# Blocked by curfew\r\n"));
        assert!(!out.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn render_keeps_foreign_bytes_that_are_not_utf8() {
        // Latin-1 comment, as found in older Windows hosts files
        let base: &[u8] = b"# Caf\xe9 router\r\n127.0.0.1 localhost\r\n";
        let out = render_hosts(base, &sites(&["reddit.com"]));

        assert!(out.starts_with(base));
        let expected: &[u8] = b"127.0.0.1 reddit.com # Blocked by curfew\r\n\
            127.0.0.1 www.reddit.com # Blocked by curfew\r\n";
        assert_eq!(&out[base.len()..], expected);
        assert_eq!(render_hosts(&out, &[]), base);
    }

    #[test]
    fn managed_lines_dedup_case_and_shared_www() {
        let lines = managed_lines(&sites(&["Reddit.com", "reddit.com"]));
        assert_eq!(lines.len(), 2);

        // www.reddit.com is shared by both entries
        let lines = managed_lines(&sites(&["reddit.com", "www.reddit.com"]));
        assert_eq!(
            lines,
            vec![
                "127.0.0.1 reddit.com # Blocked by curfew",
                "127.0.0.1 www.reddit.com # Blocked by curfew",
                "127.0.0.1 www.www.reddit.com # Blocked by curfew",
            ]
        );
    }

    #[test]
    fn www_entry_still_gets_two_lines() {
        let lines = managed_lines(&sites(&["www.example.com"]));
        assert_eq!(
            lines,
            vec![
                "127.0.0.1 www.example.com # Blocked by curfew",
                "127.0.0.1 www.www.example.com # Blocked by curfew",
            ]
        );
    }

    #[test]
    fn resync_writes_and_flushes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, BASE).unwrap();

        let host = Arc::new(MockHost::new());
        let hosts = HostsFile::new(&path, host.clone());

        let report = hosts.resync(&sites(&["reddit.com"])).unwrap();
        assert!(report.changed);
        assert!(report.flushed);
        assert_eq!(report.managed_lines, 2);
        assert_eq!(host.flush_count(), 1);

        // Second pass is a no-op
        let report = hosts.resync(&sites(&["reddit.com"])).unwrap();
        assert!(!report.changed);
        assert_eq!(host.flush_count(), 1);
    }

    #[test]
    fn resync_with_fetches_list_under_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, BASE).unwrap();
        let hosts = HostsFile::new(&path, Arc::new(MockHost::new()));

        let report = hosts.resync_with(|| sites(&["a.com", "b.com"])).unwrap();
        assert_eq!(report.managed_lines, 4);
        assert!(std::fs::read_to_string(&path).unwrap().contains("www.b.com"));
    }

    #[test]
    fn no_flush_without_capability() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, BASE).unwrap();

        let host = Arc::new(MockHost::new().with_capabilities(HostCapabilities::minimal()));
        let hosts = HostsFile::new(&path, host.clone());

        let report = hosts.resync(&sites(&["reddit.com"])).unwrap();
        assert!(report.changed);
        assert!(!report.flushed);
        assert_eq!(host.flush_count(), 0);
    }

    #[test]
    fn flush_failure_does_not_fail_resync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, BASE).unwrap();

        let host = Arc::new(MockHost::new());
        *host.fail_flush.lock() = true;
        let hosts = HostsFile::new(&path, host);

        let report = hosts.resync(&sites(&["reddit.com"])).unwrap();
        assert!(report.changed);
        assert!(!report.flushed);
    }

    #[test]
    fn missing_hosts_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let hosts = HostsFile::new(dir.path().join("missing"), Arc::new(MockHost::new()));

        let err = hosts.resync(&sites(&["reddit.com"])).unwrap_err();
        assert!(matches!(err, CurfewError::ResourceUnavailable(_)));
    }
}
