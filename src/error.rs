//! Crate-level error type — aggregates the boundary errors each component
//! raises so `main` has one `Result` to match on at the top.

use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::state::StateStoreError;

#[derive(Error, Debug)]
pub enum GueriteError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("engine connection failed: {0}")]
    Engine(#[from] EngineError),

    #[error("state store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("http control surface error: {0}")]
    Http(String),
}
