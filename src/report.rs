//! Aggregated step reporting.
//!
//! Every pipeline step records what it actually did. The run ends with one
//! consolidated report instead of silently discarded exit codes, so a
//! partially-failed run shows exactly how far it got.

use std::fmt;
use strum::Display;

/// What a single idempotent step did to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Outcome {
    /// The resource was created from scratch
    #[strum(serialize = "created")]
    Created,
    /// The resource existed but was brought up to spec (membership, modes)
    #[strum(serialize = "updated")]
    Updated,
    /// The resource was already exactly as required
    #[strum(serialize = "unchanged")]
    Unchanged,
    /// The step did not run (dry-run, or not applicable)
    #[strum(serialize = "skipped")]
    Skipped,
}

impl Outcome {
    /// Merge two outcomes for a step made of several sub-operations:
    /// any creation dominates, then any update.
    pub fn combine(self, other: Outcome) -> Outcome {
        use Outcome::*;
        match (self, other) {
            (Created, _) | (_, Created) => Created,
            (Updated, _) | (_, Updated) => Updated,
            (Unchanged, _) | (_, Unchanged) => Unchanged,
            (Skipped, Skipped) => Skipped,
        }
    }
}

/// Ordered record of step outcomes for one run.
#[derive(Debug, Default)]
pub struct RunReport {
    entries: Vec<(String, Outcome)>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed step.
    pub fn record(&mut self, step: impl Into<String>, outcome: Outcome) {
        self.entries.push((step.into(), outcome));
    }

    pub fn entries(&self) -> &[(String, Outcome)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the run changed nothing (pure re-run on a configured host).
    pub fn all_unchanged(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, o)| matches!(o, Outcome::Unchanged | Outcome::Skipped))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run report:")?;
        for (step, outcome) in &self.entries {
            writeln!(f, "  {:<40} {}", step, outcome)?;
        }
        Ok(())
    }
}
