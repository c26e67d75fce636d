//! Durable website and app blocklists
//!
//! Each list lives in its own newline-delimited UTF-8 file inside the data
//! directory. There is no header and no escaping; one name per line.

use curfew_util::{BlockedName, ListKind};
use parking_lot::RwLock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{StoreResult, write_atomic};

#[derive(Debug, Default, Clone)]
struct Lists {
    websites: Vec<BlockedName>,
    apps: Vec<BlockedName>,
}

impl Lists {
    fn get(&self, kind: ListKind) -> &Vec<BlockedName> {
        match kind {
            ListKind::Website => &self.websites,
            ListKind::App => &self.apps,
        }
    }

    fn get_mut(&mut self, kind: ListKind) -> &mut Vec<BlockedName> {
        match kind {
            ListKind::Website => &mut self.websites,
            ListKind::App => &mut self.apps,
        }
    }
}

/// Owner of both blocklists.
///
/// Mutations hold the write lock across the file replacement, so at most
/// one writer persists at a time and the in-memory list only changes once
/// the new file is in place. Readers get cloned snapshots.
#[derive(Debug)]
pub struct BlockListStore {
    dir: PathBuf,
    lists: RwLock<Lists>,
}

impl BlockListStore {
    /// Open the lists stored in `dir`. Missing files are empty lists.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        let lists = Lists {
            websites: load_file(&list_path(&dir, ListKind::Website), ListKind::Website)?,
            apps: load_file(&list_path(&dir, ListKind::App), ListKind::App)?,
        };

        info!(
            dir = %dir.display(),
            websites = lists.websites.len(),
            apps = lists.apps.len(),
            "Blocklists loaded"
        );

        Ok(Self {
            dir,
            lists: RwLock::new(lists),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: ListKind) -> PathBuf {
        list_path(&self.dir, kind)
    }

    /// Read a list straight from disk, bypassing the in-memory copy
    pub fn load(&self, kind: ListKind) -> StoreResult<Vec<BlockedName>> {
        load_file(&self.path(kind), kind)
    }

    /// Replace a list, on disk first and then in memory
    pub fn save(&self, kind: ListKind, names: &[BlockedName]) -> StoreResult<()> {
        let mut lists = self.lists.write();
        let deduped = dedup(names.iter().cloned());
        self.persist(kind, &deduped)?;
        *lists.get_mut(kind) = deduped;
        Ok(())
    }

    /// Add a name. Returns `false` if it was already present (any case).
    pub fn add(&self, kind: ListKind, name: BlockedName) -> StoreResult<bool> {
        let mut lists = self.lists.write();
        if lists.get(kind).contains(&name) {
            debug!(kind = %kind, name = %name, "Already blocked");
            return Ok(false);
        }

        let mut updated = lists.get(kind).clone();
        updated.push(name);
        self.persist(kind, &updated)?;
        *lists.get_mut(kind) = updated;
        Ok(true)
    }

    /// Remove a name. Returns `false` if it was not present.
    pub fn remove(&self, kind: ListKind, name: &BlockedName) -> StoreResult<bool> {
        let mut lists = self.lists.write();
        let Some(index) = lists.get(kind).iter().position(|n| n == name) else {
            debug!(kind = %kind, name = %name, "Not blocked, nothing to remove");
            return Ok(false);
        };

        let mut updated = lists.get(kind).clone();
        updated.remove(index);
        self.persist(kind, &updated)?;
        *lists.get_mut(kind) = updated;
        Ok(true)
    }

    pub fn contains(&self, kind: ListKind, name: &BlockedName) -> bool {
        self.lists.read().get(kind).contains(name)
    }

    /// Point-in-time copy of a list, safe to iterate while others mutate
    pub fn snapshot(&self, kind: ListKind) -> Vec<BlockedName> {
        self.lists.read().get(kind).clone()
    }

    pub fn len(&self, kind: ListKind) -> usize {
        self.lists.read().get(kind).len()
    }

    pub fn is_empty(&self, kind: ListKind) -> bool {
        self.lists.read().get(kind).is_empty()
    }

    /// Re-read both files, picking up edits made outside the process
    pub fn reload(&self) -> StoreResult<()> {
        let mut lists = self.lists.write();
        let fresh = Lists {
            websites: self.load(ListKind::Website)?,
            apps: self.load(ListKind::App)?,
        };
        info!(
            websites = fresh.websites.len(),
            apps = fresh.apps.len(),
            "Blocklists reloaded"
        );
        *lists = fresh;
        Ok(())
    }

    fn persist(&self, kind: ListKind, names: &[BlockedName]) -> StoreResult<()> {
        let path = self.path(kind);
        let mut content = String::new();
        for name in names {
            content.push_str(name.as_str());
            content.push('\n');
        }
        write_atomic(&path, content.as_bytes())?;
        debug!(kind = %kind, entries = names.len(), path = %path.display(), "Blocklist saved");
        Ok(())
    }
}

fn list_path(dir: &Path, kind: ListKind) -> PathBuf {
    dir.join(kind.file_name())
}

fn load_file(path: &Path, kind: ListKind) -> StoreResult<Vec<BlockedName>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let names = content
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(index, raw)| {
            let Ok(line) = std::str::from_utf8(raw) else {
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    "Skipping blocklist line that is not UTF-8"
                );
                return None;
            };
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                return None;
            }
            match BlockedName::parse(kind, line) {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping invalid blocklist line");
                    None
                }
            }
        });

    Ok(dedup(names))
}

/// Drop case-insensitive duplicates, keeping the first spelling
fn dedup(names: impl IntoIterator<Item = BlockedName>) -> Vec<BlockedName> {
    let mut out: Vec<BlockedName> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn website(s: &str) -> BlockedName {
        BlockedName::parse(ListKind::Website, s).unwrap()
    }

    fn app(s: &str) -> BlockedName {
        BlockedName::parse(ListKind::App, s).unwrap()
    }

    #[test]
    fn missing_files_are_empty_lists() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlockListStore::open(dir.path()).unwrap();
        assert!(store.is_empty(ListKind::Website));
        assert!(store.is_empty(ListKind::App));
        assert!(store.load(ListKind::App).unwrap().is_empty());
    }

    #[test]
    fn add_persists_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlockListStore::open(dir.path()).unwrap();

        assert!(store.add(ListKind::Website, website("Example.com")).unwrap());
        assert!(store.add(ListKind::App, app("steam")).unwrap());

        let on_disk = fs::read_to_string(dir.path().join("blocked_websites.txt")).unwrap();
        assert_eq!(on_disk, "Example.com\n");

        let reopened = BlockListStore::open(dir.path()).unwrap();
        assert_eq!(reopened.snapshot(ListKind::Website), vec![website("example.com")]);
        // Case is preserved on disk
        assert_eq!(reopened.snapshot(ListKind::Website)[0].as_str(), "Example.com");
        assert_eq!(reopened.snapshot(ListKind::App), vec![app("steam")]);
    }

    #[test]
    fn duplicate_add_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlockListStore::open(dir.path()).unwrap();

        assert!(store.add(ListKind::App, app("Discord")).unwrap());
        assert!(!store.add(ListKind::App, app("DISCORD")).unwrap());
        assert_eq!(store.len(ListKind::App), 1);
        assert_eq!(store.snapshot(ListKind::App)[0].as_str(), "Discord");
    }

    #[test]
    fn remove_absent_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlockListStore::open(dir.path()).unwrap();
        store.add(ListKind::Website, website("a.com")).unwrap();

        assert!(!store.remove(ListKind::Website, &website("b.com")).unwrap());
        assert!(store.remove(ListKind::Website, &website("A.COM")).unwrap());
        assert!(store.is_empty(ListKind::Website));
        assert_eq!(
            fs::read_to_string(dir.path().join("blocked_websites.txt")).unwrap(),
            ""
        );
    }

    #[test]
    fn load_skips_blank_invalid_and_duplicate_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("blocked_websites.txt"),
            "example.com\n\n  \nbad name\nEXAMPLE.com\nnews.org\n",
        )
        .unwrap();

        let store = BlockListStore::open(dir.path()).unwrap();
        let names: Vec<String> = store
            .snapshot(ListKind::Website)
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["example.com", "news.org"]);
    }

    #[test]
    fn load_skips_lines_that_are_not_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let content: &[u8] = b"steam\n\xff\xfebad\r\ndiscord\r\n";
        fs::write(dir.path().join("blocked_apps.txt"), content).unwrap();

        let store = BlockListStore::open(dir.path()).unwrap();
        assert_eq!(store.snapshot(ListKind::App), vec![app("steam"), app("discord")]);
        assert_eq!(store.snapshot(ListKind::App)[1].as_str(), "discord");
    }

    #[test]
    fn save_replaces_whole_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlockListStore::open(dir.path()).unwrap();
        store.add(ListKind::App, app("steam")).unwrap();

        store
            .save(ListKind::App, &[app("minecraft"), app("Minecraft"), app("lutris")])
            .unwrap();
        assert_eq!(store.load(ListKind::App).unwrap(), vec![app("minecraft"), app("lutris")]);
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlockListStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("blocked_apps.txt"), "steam\n").unwrap();

        assert!(store.is_empty(ListKind::App));
        store.reload().unwrap();
        assert!(store.contains(ListKind::App, &app("Steam")));
    }

    #[cfg(unix)]
    #[test]
    fn failed_persist_leaves_memory_unchanged() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = BlockListStore::open(dir.path()).unwrap();
        store.add(ListKind::App, app("steam")).unwrap();

        // A read-only directory prevents staging the replacement
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        let canary = dir.path().join("canary");
        let writable = fs::write(&canary, "").is_ok();
        if writable {
            // Running as root; permissions are not enforced
            fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        assert!(store.add(ListKind::App, app("discord")).is_err());
        assert_eq!(store.snapshot(ListKind::App), vec![app("steam")]);

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
    }
}
