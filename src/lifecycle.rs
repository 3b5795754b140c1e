//! Lifecycle state machine
//!
//! Tracks how far an install or configure cycle got. Transitions are
//! forward-only and validated, so a cycle can never report services as
//! reconciled without having rendered its templates first.
//!
//! ```text
//! Uninstalled
//!     ↓
//! DirectoriesReady
//!     ↓
//! TemplatesRendered      (install cycles end here)
//!     ↓
//! ServicesReconciled     (configure cycles end here)
//!
//! (Any non-terminal stage can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;

/// Stages of a cycle in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleStage {
    /// Nothing done yet
    Uninstalled = 0,

    /// Core (and backend) directories exist with their modes
    DirectoriesReady = 1,

    /// Every declared template rendered, changed files collected
    TemplatesRendered = 2,

    /// Services restarted or started according to the changed files
    ServicesReconciled = 3,

    /// The cycle aborted (terminal state)
    Failed = 255,
}

impl LifecycleStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true for ServicesReconciled and Failed
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ServicesReconciled | Self::Failed)
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Uninstalled => Some(Self::DirectoriesReady),
            Self::DirectoriesReady => Some(Self::TemplatesRendered),
            Self::TemplatesRendered => Some(Self::ServicesReconciled),
            Self::ServicesReconciled | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Uninstalled => "Uninstalled",
            Self::DirectoriesReady => "Directories ready",
            Self::TemplatesRendered => "Templates rendered",
            Self::ServicesReconciled => "Services reconciled",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Which hook a cycle serves; decides where it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Directory setup and initial render, no service handling
    Install,
    /// Full cycle up to service reconciliation
    Configure,
}

impl CycleKind {
    pub const fn final_stage(self) -> LifecycleStage {
        match self {
            Self::Install => LifecycleStage::TemplatesRendered,
            Self::Configure => LifecycleStage::ServicesReconciled,
        }
    }
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Configure => write!(f, "configure"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleTransitionError {
    #[error("Cannot skip from {from} to {to}")]
    SkippedStage {
        from: LifecycleStage,
        to: LifecycleStage,
    },

    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition {
        from: LifecycleStage,
        to: LifecycleStage,
    },

    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: LifecycleStage },

    /// The cycle already reached the last stage of its kind
    #[error("An {kind} cycle ends at {stage}")]
    BeyondFinalStage { kind: CycleKind, stage: LifecycleStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: LifecycleStage },
}

impl From<LifecycleTransitionError> for crate::error::CinderError {
    fn from(err: LifecycleTransitionError) -> Self {
        crate::error::CinderError::LifecycleTransition(err.to_string())
    }
}

/// Progress of one install or configure cycle.
#[derive(Debug, Clone)]
pub struct CycleContext {
    kind: CycleKind,
    current: LifecycleStage,
    failed_at: Option<LifecycleStage>,
}

impl CycleContext {
    pub fn new(kind: CycleKind) -> Self {
        Self {
            kind,
            current: LifecycleStage::Uninstalled,
            failed_at: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> CycleKind {
        self.kind
    }

    #[inline]
    pub fn current_stage(&self) -> LifecycleStage {
        self.current
    }

    #[inline]
    pub fn failed_at(&self) -> Option<LifecycleStage> {
        self.failed_at
    }

    /// Returns true once the last stage of this cycle kind is reached
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == self.kind.final_stage()
    }

    /// Transition to `target`, which must be the immediate next stage.
    pub fn transition_to(
        &mut self,
        target: LifecycleStage,
    ) -> Result<LifecycleStage, LifecycleTransitionError> {
        if self.current.is_terminal() {
            return Err(LifecycleTransitionError::FromTerminalState { from: self.current });
        }

        if target == self.current {
            return Err(LifecycleTransitionError::AlreadyAtStage { stage: target });
        }

        // use fail() for Failed
        if target == LifecycleStage::Failed {
            return Err(LifecycleTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.order() < self.current.order() {
            return Err(LifecycleTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }

        if self.current.next() != Some(target) {
            return Err(LifecycleTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if self.is_complete() {
            return Err(LifecycleTransitionError::BeyondFinalStage {
                kind: self.kind,
                stage: self.current,
            });
        }

        self.current = target;
        Ok(target)
    }

    /// Mark the cycle as failed, remembering the stage it failed in.
    pub fn fail(&mut self) -> Result<(), LifecycleTransitionError> {
        if self.current.is_terminal() {
            return Err(LifecycleTransitionError::FromTerminalState { from: self.current });
        }

        self.failed_at = Some(self.current);
        self.current = LifecycleStage::Failed;
        Ok(())
    }
}
