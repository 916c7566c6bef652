//! Per-action error kinds (§7), one layer up from `EngineError`: the state
//! machine matches on these to decide the Failed/RolledBack/retry
//! transition, mirroring the teacher's `DockerError` pattern applied at the
//! action-outcome level instead of the transport level.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("transient engine error: {0}")]
    TransientEngine(#[from] crate::engine::EngineError),

    #[error("image pull failed: {0}")]
    PullFailed(String),

    #[error("preflight check failed: {0}")]
    PreflightFailed(String),

    #[error("swap failed: {0}")]
    SwapFailed(String),

    #[error("health probe did not become healthy within the configured timeout")]
    HealthTimeout,
}
