//! The typed events the Notification Dispatcher filters and formats (§4
//! component 8, §7): one successful-commit event per `ActionKind`, one
//! failure event carrying the rollback/manual-intervention flags §7
//! describes (`<Action>Failed` with rollback flag), plus the three
//! cycle-level categories the scheduler/inventory/pruner emit outside any
//! single container's state machine.

use crate::config::NotificationCategory;
use crate::scheduler::ActionKind;

#[derive(Debug, Clone)]
pub enum Event {
    ActionCommitted {
        name: String,
        kind: ActionKind,
    },
    ActionFailed {
        name: String,
        kind: ActionKind,
        rolled_back: bool,
        manual_intervention_required: bool,
    },
    Startup {
        monitored: usize,
    },
    Detect {
        names: Vec<String>,
    },
    Prune {
        images_deleted: usize,
        space_reclaimed: u64,
    },
    PruneDeferred {
        reason: String,
    },
}

impl Event {
    pub fn category(&self) -> NotificationCategory {
        match self {
            Event::ActionCommitted { kind, .. } | Event::ActionFailed { kind, .. } => match kind {
                ActionKind::Update => NotificationCategory::Update,
                ActionKind::Recreate => NotificationCategory::Recreate,
                ActionKind::Restart => NotificationCategory::Restart,
                ActionKind::HealthRestart => NotificationCategory::Health,
            },
            Event::Startup { .. } => NotificationCategory::Startup,
            Event::Detect { .. } => NotificationCategory::Detect,
            Event::Prune { .. } | Event::PruneDeferred { .. } => NotificationCategory::Prune,
        }
    }

    /// Renders the event to the `{title, message}` payload shape §6
    /// describes; transports forward these two strings verbatim.
    pub fn render(&self) -> (String, String) {
        match self {
            Event::ActionCommitted { name, kind } => (
                format!("guerite: {} committed", kind_label(*kind)),
                format!("container {name}: {} committed", kind_label(*kind)),
            ),
            Event::ActionFailed {
                name,
                kind,
                rolled_back,
                manual_intervention_required,
            } => {
                let title = format!("guerite: {} failed", kind_label(*kind));
                let outcome = if *manual_intervention_required {
                    "failed, manual intervention required"
                } else if *rolled_back {
                    "failed, rolled back"
                } else {
                    "failed"
                };
                (title, format!("container {name}: {} {outcome}", kind_label(*kind)))
            }
            Event::Startup { monitored } => (
                "guerite: started".to_string(),
                format!("monitoring {monitored} container(s)"),
            ),
            Event::Detect { names } => (
                "guerite: new containers detected".to_string(),
                names.join(", "),
            ),
            Event::Prune {
                images_deleted,
                space_reclaimed,
            } => (
                "guerite: prune complete".to_string(),
                format!("removed {images_deleted} image(s), reclaimed {space_reclaimed} bytes"),
            ),
            Event::PruneDeferred { reason } => ("guerite: prune deferred".to_string(), reason.clone()),
        }
    }

    pub fn from_outcome(outcome: &crate::action::Outcome) -> Option<Event> {
        use crate::action::Outcome;
        match outcome {
            Outcome::Skipped { .. } => None,
            Outcome::Restarted { name } => Some(Event::ActionCommitted {
                name: name.clone(),
                kind: ActionKind::Restart,
            }),
            Outcome::RestartFailed {
                name,
                manual_intervention_required,
            } => Some(Event::ActionFailed {
                name: name.clone(),
                kind: ActionKind::Restart,
                rolled_back: false,
                manual_intervention_required: *manual_intervention_required,
            }),
            Outcome::Committed { name, kind } => Some(Event::ActionCommitted {
                name: name.clone(),
                kind: *kind,
            }),
            Outcome::RolledBack { name, kind } => Some(Event::ActionFailed {
                name: name.clone(),
                kind: *kind,
                rolled_back: true,
                manual_intervention_required: false,
            }),
            Outcome::Failed {
                name,
                kind,
                manual_intervention_required,
            } => Some(Event::ActionFailed {
                name: name.clone(),
                kind: *kind,
                rolled_back: false,
                manual_intervention_required: *manual_intervention_required,
            }),
        }
    }
}

fn kind_label(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Update => "update",
        ActionKind::Recreate => "recreate",
        ActionKind::Restart => "restart",
        ActionKind::HealthRestart => "health-restart",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Outcome;

    #[test]
    fn committed_update_maps_to_update_category() {
        let outcome = Outcome::Committed {
            name: "web".into(),
            kind: ActionKind::Update,
        };
        let event = Event::from_outcome(&outcome).unwrap();
        assert_eq!(event.category(), NotificationCategory::Update);
    }

    #[test]
    fn skipped_outcome_emits_no_event() {
        let outcome = Outcome::Skipped {
            name: "web".into(),
            kind: Some(ActionKind::Update),
            reason: crate::action::SkipReason::Cooldown,
        };
        assert!(Event::from_outcome(&outcome).is_none());
    }

    #[test]
    fn rolled_back_is_a_failed_event_with_rollback_flag() {
        let outcome = Outcome::RolledBack {
            name: "web".into(),
            kind: ActionKind::Recreate,
        };
        let event = Event::from_outcome(&outcome).unwrap();
        match event {
            Event::ActionFailed { rolled_back, manual_intervention_required, .. } => {
                assert!(rolled_back);
                assert!(!manual_intervention_required);
            }
            _ => panic!("expected ActionFailed"),
        }
    }
}
