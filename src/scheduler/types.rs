use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Update,
    Recreate,
    Restart,
    HealthRestart,
}

impl ActionKind {
    /// Update > Recreate > Restart > HealthRestart (§3).
    pub fn precedence(self) -> u8 {
        match self {
            ActionKind::Update => 0,
            ActionKind::Recreate => 1,
            ActionKind::Restart => 2,
            ActionKind::HealthRestart => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionModifiers {
    pub monitor_only: bool,
    pub no_pull: bool,
    pub no_restart: bool,
}

#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub name: String,
    pub project: Option<String>,
    pub kind: ActionKind,
    pub modifiers: ActionModifiers,
}

/// Scheduler-owned, not persisted: which name was last picked for a
/// rolling-restart project group, keyed by project.
#[derive(Debug, Default)]
pub struct RollingState {
    pub last_pick: BTreeMap<Option<String>, String>,
}
