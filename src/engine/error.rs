//! Engine error — mirrors the teacher's `DockerError` (`client/error.rs`):
//! a thin `thiserror` wrapper over the transport's own error type plus a
//! handful of named cases the action engine branches on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine connection failed: {0}")]
    ConnectionFailed(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("bollard error: {0}")]
    Bollard(#[from] bollard::errors::Error),
}
