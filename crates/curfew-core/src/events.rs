//! Core events emitted by the engine

use curfew_util::{ListKind, format_duration};
use std::time::Duration;

/// What the presentation layer should do in response to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiIntent {
    /// Get out of the way for the blocking period
    Hide,
    /// The blocking period is over
    Show,
    /// Show a short message without changing visibility
    Notify(String),
}

/// Events emitted by the enforcement engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// The blocking period began (or was already active at startup)
    EnforcementStarted { ends_in: Option<Duration> },

    /// The blocking period ended (or was inactive at startup)
    EnforcementEnded { resumes_in: Option<Duration> },

    /// The hosts file was rewritten
    HostsResynced { managed_lines: usize },

    /// A blocklist changed outside the normal block/unblock flow
    BlocklistChanged { kind: ListKind, entries: usize },
}

impl CoreEvent {
    pub fn ui_intent(&self) -> Option<UiIntent> {
        match self {
            CoreEvent::EnforcementStarted { .. } => Some(UiIntent::Hide),
            CoreEvent::EnforcementEnded { .. } => Some(UiIntent::Show),
            CoreEvent::BlocklistChanged { kind, entries } => Some(UiIntent::Notify(format!(
                "{} {} now blocked",
                entries,
                kind.plural()
            ))),
            CoreEvent::HostsResynced { .. } => None,
        }
    }

    /// One-line description for the console and logs
    pub fn describe(&self) -> String {
        match self {
            CoreEvent::EnforcementStarted { ends_in: Some(d) } => {
                format!("Blocking period active, ends in {}", format_duration(*d))
            }
            CoreEvent::EnforcementStarted { ends_in: None } => "Blocking period active".into(),
            CoreEvent::EnforcementEnded { resumes_in: Some(d) } => {
                format!("Blocking period over, resumes in {}", format_duration(*d))
            }
            CoreEvent::EnforcementEnded { resumes_in: None } => "Blocking period over".into(),
            CoreEvent::HostsResynced { managed_lines } => {
                format!("Hosts file updated ({} managed lines)", managed_lines)
            }
            CoreEvent::BlocklistChanged { kind, entries } => {
                format!("{} blocklist reloaded ({} entries)", kind, entries)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_map_to_visibility() {
        let start = CoreEvent::EnforcementStarted { ends_in: None };
        let end = CoreEvent::EnforcementEnded { resumes_in: None };
        assert_eq!(start.ui_intent(), Some(UiIntent::Hide));
        assert_eq!(end.ui_intent(), Some(UiIntent::Show));
        assert_eq!(CoreEvent::HostsResynced { managed_lines: 4 }.ui_intent(), None);
    }

    #[test]
    fn list_changes_notify() {
        let event = CoreEvent::BlocklistChanged {
            kind: ListKind::App,
            entries: 3,
        };
        assert_eq!(
            event.ui_intent(),
            Some(UiIntent::Notify("3 apps now blocked".into()))
        );
    }

    #[test]
    fn describe_includes_remaining_time() {
        let event = CoreEvent::EnforcementStarted {
            ends_in: Some(Duration::from_secs(5400)),
        };
        assert_eq!(event.describe(), "Blocking period active, ends in 1h 30m 0s");
    }
}
