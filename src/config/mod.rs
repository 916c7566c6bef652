//! Configuration module — environment-driven settings and label-key names.

pub mod labels;
pub mod load;
pub mod model;

pub use labels::LabelKeys;
pub use model::{Config, ConfigError, NotificationCategory};
