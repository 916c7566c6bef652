//! State store errors — kept separate from the engine/config error enums
//! the same way the teacher keeps `DockerError` and `AgentConfigError`
//! distinct per module boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rename temp state file into place at {path}: {source}")]
    Rename {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}
