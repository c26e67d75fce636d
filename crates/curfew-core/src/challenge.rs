//! Unblock challenge: a random string to memorize plus a small arithmetic
//! problem, both answered from memory after the string is hidden.

use rand::Rng;
use std::fmt;

/// Characters a challenge string is drawn from
pub const CHALLENGE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+[]{}|;:',.<>?/";

/// `(a * b) - c` with two-digit operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticProblem {
    pub a: i64,
    pub b: i64,
    pub c: i64,
}

impl ArithmeticProblem {
    pub fn answer(&self) -> i64 {
        self.a * self.b - self.c
    }
}

impl fmt::Display for ArithmeticProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} * {}) - {} = ?", self.a, self.b, self.c)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    text: String,
    problem: ArithmeticProblem,
}

impl Challenge {
    pub fn generate(length: usize) -> Self {
        Self::generate_with(&mut rand::thread_rng(), length)
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Self {
        let text = (0..length)
            .map(|_| CHALLENGE_ALPHABET[rng.gen_range(0..CHALLENGE_ALPHABET.len())] as char)
            .collect();

        let problem = ArithmeticProblem {
            a: rng.gen_range(10..99),
            b: rng.gen_range(10..99),
            c: rng.gen_range(10..99),
        };

        Self { text, problem }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn problem(&self) -> &ArithmeticProblem {
        &self.problem
    }

    /// Exact, case-sensitive match after trimming surrounding whitespace
    pub fn check_text(&self, input: &str) -> bool {
        input.trim() == self.text
    }

    pub fn check_answer(&self, input: &str) -> bool {
        input
            .trim()
            .parse::<i64>()
            .is_ok_and(|v| v == self.problem.answer())
    }

    pub fn check(&self, text: &str, answer: &str) -> bool {
        self.check_text(text) && self.check_answer(answer)
    }
}
