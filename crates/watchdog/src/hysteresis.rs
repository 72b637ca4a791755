//! Per-signal hysteresis: turns raw probe outcomes into a stable verdict.

use crate::types::{ProbeOutcome, Verdict};

/// Consecutive-failure counter for a single signal.
///
/// A pass resets the streak. A fail extends it, and the verdict only flips
/// to [`Verdict::Fail`] once the streak reaches the threshold. An error
/// extends the streak too but fails at once: a check that could not run
/// is never forgiven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HysteresisEvaluator {
    threshold: u32,
    streak: u32,
}

impl HysteresisEvaluator {
    /// Create an evaluator. A threshold of 0 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            streak: 0,
        }
    }

    /// Feed one raw outcome and return this cycle's verdict
    pub fn evaluate(&mut self, outcome: &ProbeOutcome) -> Verdict {
        match outcome {
            ProbeOutcome::Pass => {
                self.streak = 0;
                Verdict::Pass
            }
            ProbeOutcome::Fail(_) => {
                self.streak = self.streak.saturating_add(1);
                if self.streak >= self.threshold {
                    Verdict::Fail
                } else {
                    Verdict::Pass
                }
            }
            ProbeOutcome::Error(_) => {
                self.streak = self.streak.saturating_add(1);
                Verdict::Fail
            }
        }
    }

    /// Current failure streak
    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
