//! Control Surface module (§4.11) — the optional HTTP listener and the
//! process metrics it exposes.

pub mod http;
pub mod metrics;

pub use http::{build_router, ControlState};
pub use metrics::Metrics;
