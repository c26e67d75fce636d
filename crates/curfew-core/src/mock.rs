//! Test doubles for the challenge and authentication seams

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{AuthOutcome, Authenticator, ChallengeOutcome, Challenger};

/// Challenger that replays queued outcomes, then a fixed fallback
pub struct ScriptedChallenger {
    queue: Mutex<VecDeque<ChallengeOutcome>>,
    fallback: ChallengeOutcome,
    delay: Duration,
    presented: AtomicUsize,
}

impl ScriptedChallenger {
    pub fn always(outcome: ChallengeOutcome) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: outcome,
            delay: Duration::ZERO,
            presented: AtomicUsize::new(0),
        }
    }

    /// Sleep this long before answering, like a slow user
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push(&self, outcome: ChallengeOutcome) {
        self.queue.lock().push_back(outcome);
    }

    /// How many times the challenge was shown
    pub fn presented(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }
}

impl Challenger for ScriptedChallenger {
    fn present(&self) -> ChallengeOutcome {
        self.presented.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.queue.lock().pop_front().unwrap_or(self.fallback)
    }
}

/// In-memory credential, compared in plain text
#[derive(Default)]
pub struct StaticAuthenticator {
    password: Mutex<Option<String>>,
}

impl StaticAuthenticator {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn with_password(password: &str) -> Self {
        Self {
            password: Mutex::new(Some(password.to_string())),
        }
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, password: &str) -> AuthOutcome {
        match self.password.lock().as_deref() {
            None => AuthOutcome::Authenticated,
            Some(stored) if !password.is_empty() && stored == password => {
                AuthOutcome::Authenticated
            }
            Some(_) => AuthOutcome::Rejected,
        }
    }

    fn has_credential(&self) -> bool {
        self.password.lock().is_some()
    }

    fn update_credential(&self, password: Option<&str>) -> curfew_util::Result<()> {
        *self.password.lock() = password.map(str::to_string);
        Ok(())
    }
}
