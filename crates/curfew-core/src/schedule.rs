//! Schedule oracle

use chrono::{DateTime, Local};
use curfew_util::ScheduleWindow;
use std::fmt;

/// Whether the blocking period is in force
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementState {
    Idle,
    Enforcing,
}

impl fmt::Display for EnforcementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnforcementState::Idle => write!(f, "idle"),
            EnforcementState::Enforcing => write!(f, "enforcing"),
        }
    }
}

/// Answers "is enforcement active at this instant" from wall-clock time alone
#[derive(Debug, Clone)]
pub struct ScheduleOracle {
    window: ScheduleWindow,
}

impl ScheduleOracle {
    pub fn new(window: ScheduleWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &ScheduleWindow {
        &self.window
    }

    pub fn is_active(&self, now: &DateTime<Local>) -> bool {
        self.window.contains(now)
    }

    pub fn state_at(&self, now: &DateTime<Local>) -> EnforcementState {
        if self.is_active(now) {
            EnforcementState::Enforcing
        } else {
            EnforcementState::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use curfew_util::WallClock;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 9, 1, h, m, 0).unwrap()
    }

    #[test]
    fn wrapping_window_states() {
        let oracle = ScheduleOracle::new(ScheduleWindow::new(
            WallClock::new(4, 0).unwrap(),
            WallClock::MIDNIGHT,
        ));

        assert_eq!(oracle.state_at(&at(23, 59)), EnforcementState::Enforcing);
        assert_eq!(oracle.state_at(&at(0, 0)), EnforcementState::Enforcing);
        assert_eq!(oracle.state_at(&at(3, 59)), EnforcementState::Idle);
        assert_eq!(oracle.state_at(&at(4, 0)), EnforcementState::Enforcing);
    }

    #[test]
    fn default_window_states() {
        let oracle = ScheduleOracle::new(ScheduleWindow::default());
        assert!(!oracle.is_active(&at(7, 59)));
        assert!(oracle.is_active(&at(8, 0)));
        assert!(oracle.is_active(&at(18, 0)));
        assert!(!oracle.is_active(&at(18, 1)));
    }
}
