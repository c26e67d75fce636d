//! Terminal presentation of the unblock challenge

use curfew_config::UnblockPolicy;
use curfew_core::{Challenge, ChallengeOutcome, Challenger};
use curfew_util::format_duration;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::input::{LineInput, ReadLine};

type Generator = Box<dyn Fn(usize) -> Challenge + Send + Sync>;

/// Shows the text to memorize, hides it, then asks for it back together
/// with the answer to the arithmetic problem.
pub struct TerminalChallenge {
    input: Arc<LineInput>,
    policy: UnblockPolicy,
    generate: Generator,
}

impl TerminalChallenge {
    pub fn new(input: Arc<LineInput>, policy: UnblockPolicy) -> Self {
        Self {
            input,
            policy,
            generate: Box::new(Challenge::generate),
        }
    }

    pub fn with_generator(
        mut self,
        generate: impl Fn(usize) -> Challenge + Send + Sync + 'static,
    ) -> Self {
        self.generate = Box::new(generate);
        self
    }

    fn read_before(&self, deadline: Instant, prompt: &str) -> Result<String, ChallengeOutcome> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ChallengeOutcome::TimedOut);
        }

        print!("{}", prompt);
        let _ = std::io::stdout().flush();

        match self.input.read_line_timeout(remaining) {
            ReadLine::Line(line) if line.trim().is_empty() => Err(ChallengeOutcome::Failed),
            ReadLine::Line(line) => Ok(line),
            ReadLine::TimedOut => Err(ChallengeOutcome::TimedOut),
            ReadLine::Closed => Err(ChallengeOutcome::Failed),
        }
    }

    fn answer(&self, challenge: &Challenge, deadline: Instant) -> Result<(), ChallengeOutcome> {
        loop {
            let text = self.read_before(deadline, "text> ")?;
            let answer = self.read_before(deadline, "answer> ")?;

            if challenge.check(&text, &answer) {
                return Ok(());
            }

            let left = deadline.saturating_duration_since(Instant::now());
            println!("Not quite. {} left.", format_duration(left));
        }
    }
}

impl Challenger for TerminalChallenge {
    fn present(&self) -> ChallengeOutcome {
        let challenge = (self.generate)(self.policy.challenge_length);

        println!();
        println!(
            "Memorize this text, it disappears in {}:",
            format_duration(self.policy.memorize_for)
        );
        println!();
        println!("    {}", challenge.text());
        println!();
        std::thread::sleep(self.policy.memorize_for);

        clear_screen();
        let skipped = self.input.drain();
        if skipped > 0 {
            info!(skipped, "Ignored input typed while memorizing");
        }

        let deadline = Instant::now() + self.policy.challenge_timeout;
        println!(
            "Type the text from memory, then solve {} ({} to answer, empty line gives up)",
            challenge.problem(),
            format_duration(self.policy.challenge_timeout)
        );

        match self.answer(&challenge, deadline) {
            Ok(()) => ChallengeOutcome::Passed,
            Err(outcome) => {
                println!("Challenge {}.", outcome);
                outcome
            }
        }
    }
}

/// Challenger for runs without a console: nobody can answer, so every
/// challenge fails.
pub struct HeadlessChallenger;

impl Challenger for HeadlessChallenger {
    fn present(&self) -> ChallengeOutcome {
        warn!("Unblock challenge requested without a console");
        ChallengeOutcome::Failed
    }
}

fn clear_screen() {
    print!("\x1b[2J\x1b[H");
    let _ = std::io::stdout().flush();
}
