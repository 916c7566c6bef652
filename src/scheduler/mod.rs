//! Scheduler module (§4.5) — decides, per cycle, which monitored containers
//! need an action and which one, ahead of dependency ordering and dispatch.

pub mod plan;
pub mod types;

pub use plan::Scheduler;
pub use types::{ActionKind, ActionModifiers, PlannedAction, RollingState};
