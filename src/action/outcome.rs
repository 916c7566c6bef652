//! The terminal outcomes the per-container state machine can reach. The
//! loop driver folds these into `BackoffRecord` commits and notification
//! events; the state machine itself only cares which bucket it landed in.

use crate::scheduler::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Cooldown,
    Backoff,
    DependencyUnhealthy,
    NoPull,
    NoRestart,
    MonitorOnly,
    DryRun,
    RunOnce,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Skipped {
        name: String,
        kind: Option<ActionKind>,
        reason: SkipReason,
    },
    Restarted {
        name: String,
    },
    RestartFailed {
        name: String,
        manual_intervention_required: bool,
    },
    Committed {
        name: String,
        kind: ActionKind,
    },
    RolledBack {
        name: String,
        kind: ActionKind,
    },
    Failed {
        name: String,
        kind: ActionKind,
        manual_intervention_required: bool,
    },
}

impl Outcome {
    pub fn name(&self) -> &str {
        match self {
            Outcome::Skipped { name, .. }
            | Outcome::Restarted { name }
            | Outcome::RestartFailed { name, .. }
            | Outcome::Committed { name, .. }
            | Outcome::RolledBack { name, .. }
            | Outcome::Failed { name, .. } => name,
        }
    }

    /// Whether this outcome counts as a success for backoff bookkeeping.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Restarted { .. } | Outcome::Committed { .. })
    }
}
