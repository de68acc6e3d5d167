//! Setup stage machine
//!
//! An authoritative, Rust-side source of truth for pipeline progress. It
//! enforces valid transitions and makes it impossible to skip steps
//! programmatically.
//!
//! # Stage flow
//!
//! ```text
//! NotStarted -> Probing -> Configuring -> Provisioning -> GeneratingKeys
//!            -> WritingLaunchers -> Integrating -> Completed
//!
//! (Any stage can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;

/// Pipeline stages in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SetupStage {
    /// Nothing has run yet
    NotStarted = 0,
    /// Pre-flight environment checks
    Probing = 1,
    /// Collecting/validating the configuration
    Configuring = 2,
    /// Accounts, groups, directories, secrets
    Provisioning = 3,
    /// Deposit CLI orchestration and permission policy
    GeneratingKeys = 4,
    /// Launcher script templating
    WritingLaunchers = 5,
    /// Firewall, cron, desktop shortcuts
    Integrating = 6,
    /// Terminal success state
    Completed = 7,
    /// Terminal failure state
    Failed = 255,
}

impl SetupStage {
    /// Numeric order of this stage.
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// True for Completed and Failed.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The next stage in the sequence, or None at a terminal state.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Probing),
            Self::Probing => Some(Self::Configuring),
            Self::Configuring => Some(Self::Provisioning),
            Self::Provisioning => Some(Self::GeneratingKeys),
            Self::GeneratingKeys => Some(Self::WritingLaunchers),
            Self::WritingLaunchers => Some(Self::Integrating),
            Self::Integrating => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    /// Human-readable description of this stage.
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Probing => "Checking the environment",
            Self::Configuring => "Collecting configuration",
            Self::Provisioning => "Provisioning accounts and directories",
            Self::GeneratingKeys => "Generating validator keys",
            Self::WritingLaunchers => "Writing launcher scripts",
            Self::Integrating => "Registering firewall, cron and shortcuts",
            Self::Completed => "Setup complete",
            Self::Failed => "Setup failed",
        }
    }

    /// All stages in order (excluding Failed).
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::Probing,
            Self::Configuring,
            Self::Provisioning,
            Self::GeneratingKeys,
            Self::WritingLaunchers,
            Self::Integrating,
            Self::Completed,
        ]
    }
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupTransitionError {
    /// Attempted to skip one or more stages
    #[error("Cannot skip from {from} to {to} (must transition through intermediate stages)")]
    SkippedStage { from: SetupStage, to: SetupStage },

    /// Attempted to go backwards (not allowed)
    #[error("Cannot go backwards from {from} to {to} (setup is forward-only)")]
    BackwardTransition { from: SetupStage, to: SetupStage },

    /// Attempted to transition from a terminal state
    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: SetupStage },

    /// Attempted to transition to the current stage
    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: SetupStage },
}

/// Context tracking the current setup stage with validated transitions.
#[derive(Debug, Clone)]
pub struct SetupContext {
    current: SetupStage,
    failed_at: Option<SetupStage>,
}

impl SetupContext {
    pub fn new() -> Self {
        Self {
            current: SetupStage::NotStarted,
            failed_at: None,
        }
    }

    /// Current stage.
    pub fn current_stage(&self) -> SetupStage {
        self.current
    }

    /// Stage at which the run failed, if it did.
    pub fn failed_stage(&self) -> Option<SetupStage> {
        self.failed_at
    }

    /// Advance to the next stage in sequence.
    pub fn advance(&mut self) -> Result<SetupStage, SetupTransitionError> {
        match self.current.next() {
            Some(next) => {
                self.current = next;
                Ok(next)
            }
            None => Err(SetupTransitionError::FromTerminalState { from: self.current }),
        }
    }

    /// Transition to a specific stage; only the immediate successor is legal.
    pub fn transition_to(&mut self, target: SetupStage) -> Result<(), SetupTransitionError> {
        if self.current.is_terminal() {
            return Err(SetupTransitionError::FromTerminalState { from: self.current });
        }
        if target == self.current {
            return Err(SetupTransitionError::AlreadyAtStage { stage: target });
        }
        if target == SetupStage::Failed {
            self.fail();
            return Ok(());
        }
        if target.order() < self.current.order() {
            return Err(SetupTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }
        match self.current.next() {
            Some(next) if next == target => {
                self.current = target;
                Ok(())
            }
            _ => Err(SetupTransitionError::SkippedStage {
                from: self.current,
                to: target,
            }),
        }
    }

    /// Mark the run failed at the current stage.
    pub fn fail(&mut self) {
        self.failed_at = Some(self.current);
        self.current = SetupStage::Failed;
    }
}

impl Default for SetupContext {
    fn default() -> Self {
        Self::new()
    }
}
