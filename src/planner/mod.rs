//! Dependency Planner module (§4.4).

pub mod graph;

pub use graph::{plan, DependencyPlan};
