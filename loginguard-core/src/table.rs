use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

/// Keyed state shared by concurrent callers.
///
/// Every update runs under the shard lock of its key, so concurrent
/// read-modify-write cycles on the same key never lose updates. Each
/// effective change bumps a generation counter and wakes whoever is
/// subscribed (the persistence writer).
pub(crate) struct StateTable<T> {
    entries: DashMap<String, T>,
    generation: AtomicU64,
    dirty: watch::Sender<u64>,
}

impl<T: Clone + PartialEq> StateTable<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            dirty: watch::channel(0).0,
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Atomically runs `f` against the slot for `key`.
    ///
    /// Setting the slot to `None` deletes the key. `f` must not touch the
    /// table itself, the shard stays locked while it runs.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut Option<T>) -> R) -> R {
        let (result, changed) = match self.entries.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(occupied.get().clone());
                let result = f(&mut slot);
                match slot {
                    Some(value) if value == *occupied.get() => (result, false),
                    Some(value) => {
                        occupied.insert(value);
                        (result, true)
                    }
                    None => {
                        occupied.remove();
                        (result, true)
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                let result = f(&mut slot);
                match slot {
                    Some(value) => {
                        vacant.insert(value);
                        (result, true)
                    }
                    None => (result, false),
                }
            }
        };
        if changed {
            self.mark_dirty();
        }
        result
    }

    pub fn remove(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.mark_dirty();
        }
        removed
    }

    /// Drops every entry for which `keep` returns false, returning how many were dropped.
    pub fn retain(&self, mut keep: impl FnMut(&str, &T) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, value| {
            let kept = keep(key, value);
            if !kept {
                removed += 1;
            }
            kept
        });
        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    /// Replaces the table contents without marking it dirty, used for the initial load.
    pub fn load(&self, entries: HashMap<String, T>) {
        self.entries.clear();
        for (key, value) in entries {
            self.entries.insert(key, value);
        }
    }

    pub fn snapshot(&self) -> HashMap<String, T> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.dirty.subscribe()
    }

    fn mark_dirty(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.dirty.send_replace(generation);
    }
}
