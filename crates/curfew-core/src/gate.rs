//! Unblock gate
//!
//! Every unblock must get past two checks, in order: the hourly attempt
//! limit, then a challenge the user completes within a fixed budget.

use chrono::{DateTime, Local, NaiveDateTime};
use curfew_config::UnblockPolicy;
use curfew_util::HourlyAttemptLedger;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Slack added to the challenge budget for terminal round trips
pub const CHALLENGE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Passed,
    Failed,
    TimedOut,
}

impl fmt::Display for ChallengeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeOutcome::Passed => write!(f, "passed"),
            ChallengeOutcome::Failed => write!(f, "failed"),
            ChallengeOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Presents the unblock challenge to the user and reports how it went.
///
/// Implementations block until the user answers or gives up.
pub trait Challenger: Send + Sync {
    fn present(&self) -> ChallengeOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    Permitted { remaining: u32 },
    Denied { retry_at: NaiveDateTime },
}

pub struct UnblockGate {
    ledger: Mutex<HourlyAttemptLedger>,
    challenger: Arc<dyn Challenger>,
    budget: Duration,
    grace: Duration,
}

impl UnblockGate {
    pub fn new(policy: &UnblockPolicy, challenger: Arc<dyn Challenger>) -> Self {
        Self {
            ledger: Mutex::new(HourlyAttemptLedger::new(policy.max_attempts_per_hour)),
            challenger,
            budget: policy.challenge_budget(),
            grace: CHALLENGE_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Count an attempt against the hour containing `now`.
    ///
    /// A denied attempt is not counted.
    pub fn try_consume_attempt(&self, now: &DateTime<Local>) -> AttemptDecision {
        let mut ledger = self.ledger.lock();
        if ledger.try_consume(now) {
            let remaining = ledger.remaining(now);
            debug!(remaining, "Unblock attempt counted");
            AttemptDecision::Permitted { remaining }
        } else {
            let retry_at = ledger.next_reset(now);
            info!(max = ledger.max_per_hour(), %retry_at, "Unblock attempt limit reached");
            AttemptDecision::Denied { retry_at }
        }
    }

    /// Present the challenge. A pass reported after the budget ran out
    /// counts as a timeout.
    pub fn require_challenge(&self) -> ChallengeOutcome {
        let started = Instant::now();
        let outcome = self.challenger.present();
        let elapsed = started.elapsed();

        if outcome == ChallengeOutcome::Passed && elapsed > self.budget + self.grace {
            info!(elapsed_ms = elapsed.as_millis() as u64, "Challenge passed after the deadline");
            return ChallengeOutcome::TimedOut;
        }

        debug!(%outcome, elapsed_ms = elapsed.as_millis() as u64, "Challenge finished");
        outcome
    }

    pub fn max_per_hour(&self) -> u32 {
        self.ledger.lock().max_per_hour()
    }

    pub fn attempts_used(&self, now: &DateTime<Local>) -> u32 {
        self.ledger.lock().used(now)
    }

    pub fn attempts_remaining(&self, now: &DateTime<Local>) -> u32 {
        self.ledger.lock().remaining(now)
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedChallenger;
    use chrono::TimeZone;

    fn policy(max: u32) -> UnblockPolicy {
        UnblockPolicy {
            max_attempts_per_hour: max,
            ..UnblockPolicy::default()
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 9, 1, h, m, 0).unwrap()
    }

    #[test]
    fn attempts_limited_per_calendar_hour() {
        let challenger = Arc::new(ScriptedChallenger::always(ChallengeOutcome::Passed));
        let gate = UnblockGate::new(&policy(2), challenger);
        let permitted = |remaining| AttemptDecision::Permitted { remaining };

        assert_eq!(gate.try_consume_attempt(&at(10, 5)), permitted(1));
        assert_eq!(gate.try_consume_attempt(&at(10, 30)), permitted(0));

        let retry_at = at(11, 0).naive_local();
        assert_eq!(
            gate.try_consume_attempt(&at(10, 59)),
            AttemptDecision::Denied { retry_at }
        );
        assert_eq!(gate.attempts_used(&at(10, 59)), 2);

        // New hour, fresh budget
        assert_eq!(gate.try_consume_attempt(&at(11, 0)), permitted(1));
        assert_eq!(gate.attempts_remaining(&at(11, 1)), 1);
    }

    #[test]
    fn challenge_outcomes_pass_through() {
        let challenger = Arc::new(ScriptedChallenger::always(ChallengeOutcome::Failed));
        challenger.push(ChallengeOutcome::Passed);
        challenger.push(ChallengeOutcome::TimedOut);
        let gate = UnblockGate::new(&policy(2), challenger.clone());

        assert_eq!(gate.require_challenge(), ChallengeOutcome::Passed);
        assert_eq!(gate.require_challenge(), ChallengeOutcome::TimedOut);
        assert_eq!(gate.require_challenge(), ChallengeOutcome::Failed);
        assert_eq!(challenger.presented(), 3);
    }

    #[test]
    fn late_pass_becomes_timeout() {
        let policy = UnblockPolicy {
            challenge_timeout: Duration::ZERO,
            memorize_for: Duration::ZERO,
            ..UnblockPolicy::default()
        };
        let challenger = ScriptedChallenger::always(ChallengeOutcome::Passed)
            .with_delay(Duration::from_millis(50));
        let gate = UnblockGate::new(&policy, Arc::new(challenger)).with_grace(Duration::ZERO);

        assert_eq!(gate.require_challenge(), ChallengeOutcome::TimedOut);
    }

    #[test]
    fn budget_covers_memorize_and_answer() {
        let gate = UnblockGate::new(
            &UnblockPolicy::default(),
            Arc::new(ScriptedChallenger::always(ChallengeOutcome::Passed)),
        );
        assert_eq!(gate.budget(), Duration::from_secs(70));
    }
}
