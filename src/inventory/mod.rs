//! Container Inventory module (§4.3) — turns the engine's raw container
//! list into the per-cycle `MonitoredContainer` snapshots the rest of the
//! crate works with.

pub mod collect;
pub mod model;

pub use collect::{Inventory, InventoryCycle};
pub use model::{ActionCrons, HookCommands, MonitoredContainer, Overrides};
