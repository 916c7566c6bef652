//! State Store (§4.2) — persists `BackoffRecord`s across restarts.
//!
//! `load()` never fails the caller: a missing or corrupt file is treated as
//! empty and logged at `warn!`. `commit()` writes to a sibling temp file and
//! renames it over the target, the same write-temp-then-rename idiom the
//! pack uses for rotate-in-place file swaps (`logging/rotation.rs`) and
//! `komodo`'s repo-directory swap (`api/git.rs`), applied here to a single
//! JSON document instead of a directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::Rng;

use super::backoff::BackoffRecord;
use super::error::StateStoreError;

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> BTreeMap<String, BackoffRecord> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %err,
                        "state file is corrupt, starting with empty state"
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to read state file, starting with empty state"
                );
                BTreeMap::new()
            }
        }
    }

    pub async fn commit(
        &self,
        state: &BTreeMap<String, BackoffRecord>,
    ) -> Result<(), StateStoreError> {
        let body = serde_json::to_vec_pretty(state)?;

        let tmp_path = temp_path(&self.path);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
        }

        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|source| StateStoreError::Write {
                path: tmp_path.display().to_string(),
                source,
            })?;

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| StateStoreError::Rename {
                path: self.path.display().to_string(),
                source,
            })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let suffix: u32 = rand::rng().random();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "state.json".to_string());
    path.with_file_name(format!("{file_name}.tmp-{suffix:08x}"))
}
