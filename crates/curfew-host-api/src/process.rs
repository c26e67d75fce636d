//! Process table entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// A running process as reported by the OS.
///
/// `name` is the bare executable name without directory or extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }

    /// Lowercased name with a trailing `.exe` removed, the form blocklist
    /// entries are compared against
    pub fn match_key(&self) -> String {
        let name = self.name.to_lowercase();
        match name.strip_suffix(".exe") {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => name,
        }
    }

    /// Whether this is the calling process
    pub fn is_current(&self) -> bool {
        self.pid == std::process::id()
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (pid {})", self.name, self.pid)
    }
}
