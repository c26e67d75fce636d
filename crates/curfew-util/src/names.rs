//! Strongly-typed blocklist names

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CurfewError, Result};

/// Which blocklist a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Website,
    App,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Website, ListKind::App];

    /// File name of the persisted list inside the data directory
    pub fn file_name(self) -> &'static str {
        match self {
            ListKind::Website => "blocked_websites.txt",
            ListKind::App => "blocked_apps.txt",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            ListKind::Website => "websites",
            ListKind::App => "apps",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Website => write!(f, "website"),
            ListKind::App => write!(f, "app"),
        }
    }
}

impl FromStr for ListKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "website" | "websites" | "site" | "sites" | "web" => Ok(ListKind::Website),
            "app" | "apps" | "application" | "applications" => Ok(ListKind::App),
            other => Err(format!("unknown list '{}', expected 'website' or 'app'", other)),
        }
    }
}

/// A validated entry of a blocklist.
///
/// Equality is case-insensitive; the original spelling is kept for display
/// and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockedName(String);

impl BlockedName {
    /// Normalize and validate user input for the given list.
    ///
    /// Websites lose surrounding whitespace, a leading `http://` or
    /// `https://`, and anything from the first `/` or `?` on. Apps lose
    /// surrounding whitespace and a trailing `.exe`.
    pub fn parse(kind: ListKind, raw: &str) -> Result<Self> {
        match kind {
            ListKind::Website => Self::parse_website(raw),
            ListKind::App => Self::parse_app(raw),
        }
    }

    fn parse_website(raw: &str) -> Result<Self> {
        let mut name = raw.trim();
        for scheme in ["http://", "https://"] {
            if let Some(rest) = strip_prefix_ignore_case(name, scheme) {
                name = rest;
                break;
            }
        }
        if let Some(end) = name.find(['/', '?']) {
            name = &name[..end];
        }
        let name = name.trim_end_matches('.');

        let reject = |reason: &str| CurfewError::invalid_name(ListKind::Website, raw, reason);
        if name.is_empty() {
            return Err(reject("name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(reject("contains whitespace"));
        }
        if name.contains('#') {
            return Err(reject("contains '#'"));
        }
        if name.contains(':') {
            return Err(reject("ports and IPv6 literals cannot be blocked"));
        }

        Ok(Self(name.to_string()))
    }

    fn parse_app(raw: &str) -> Result<Self> {
        let mut name = raw.trim();
        if let Some(stem) = strip_suffix_ignore_case(name, ".exe").filter(|s| !s.is_empty()) {
            name = stem;
        }

        let reject = |reason: &str| CurfewError::invalid_name(ListKind::App, raw, reason);
        if name.is_empty() {
            return Err(reject("name is empty"));
        }
        if name.contains(['/', '\\']) {
            return Err(reject("use the process name, not a path"));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw name (a process name,
    /// a hosts entry, user input)
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other || self.0.to_lowercase() == other.to_lowercase()
    }
}

impl PartialEq for BlockedName {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for BlockedName {}

impl fmt::Display for BlockedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BlockedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    let tail = s.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &s[..split])
}
