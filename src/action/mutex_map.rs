//! Per-container action mutex (§5). Serializes actions against the same
//! base name across concurrent project dispatches without serializing
//! unrelated containers, using the same `dashmap` crate the teacher already
//! depends on for its inventory cache.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ActionMutexMap {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ActionMutexMap {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let entry = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        entry.lock_owned().await
    }

    /// Drop entries for names no longer present in the current inventory
    /// snapshot, run once at the start of every cycle so the map doesn't
    /// grow unbounded as containers come and go.
    pub fn sweep(&self, known_names: &HashSet<String>) {
        self.locks.retain(|name, _| known_names.contains(name));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_serializes_same_name() {
        let map = ActionMutexMap::new();
        let guard = map.acquire("web").await;
        drop(guard);
        let _guard2 = map.acquire("web").await;
    }

    #[test]
    fn sweep_drops_unknown_names() {
        let map = ActionMutexMap::new();
        map.locks.insert("web".to_string(), Arc::new(Mutex::new(())));
        map.locks.insert("stale".to_string(), Arc::new(Mutex::new(())));

        let mut known = HashSet::new();
        known.insert("web".to_string());
        map.sweep(&known);

        assert_eq!(map.len(), 1);
        assert!(map.locks.contains_key("web"));
    }
}
