use std::sync::{Arc, Weak};
use std::time::Duration;

use loginguard_common::LoginGuardError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::StateStore;
use crate::table::StateTable;

const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
struct WriteOutcome {
    generation: u64,
    error: Option<String>,
}

/// Background task that mirrors a [`StateTable`] into a [`StateStore`].
///
/// Changes coalesce: the writer always saves the latest snapshot, tagged
/// with the table generation read before the snapshot was taken.
pub(crate) struct PersistenceWriter {
    outcome: watch::Receiver<WriteOutcome>,
    task: JoinHandle<()>,
}

impl PersistenceWriter {
    pub fn spawn<T>(
        name: &'static str,
        table: &Arc<StateTable<T>>,
        store: Arc<dyn StateStore<T>>,
    ) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let mut dirty = table.subscribe();
        let (outcome_tx, outcome) = watch::channel(WriteOutcome {
            generation: table.generation(),
            error: None,
        });
        let table = Arc::downgrade(table);

        let task = tokio::spawn(async move {
            let mut retry = false;
            loop {
                if retry {
                    tokio::select! {
                        changed = dirty.changed() => if changed.is_err() { break },
                        _ = tokio::time::sleep(RETRY_DELAY) => {},
                    }
                } else if dirty.changed().await.is_err() {
                    break;
                }

                let Some((generation, snapshot)) = upgrade_snapshot(&table) else {
                    break;
                };

                match store.save(&snapshot).await {
                    Ok(()) => {
                        debug!(store = name, generation, entries = snapshot.len(), "Saved state");
                        retry = false;
                        outcome_tx.send_replace(WriteOutcome {
                            generation,
                            error: None,
                        });
                    }
                    Err(err) => {
                        error!(store = name, generation, error = %err, "Failed to save state");
                        retry = true;
                        outcome_tx.send_replace(WriteOutcome {
                            generation,
                            error: Some(err.to_string()),
                        });
                    }
                }
            }
            debug!(store = name, "Persistence writer stopped");
        });

        Self { outcome, task }
    }

    /// Waits until everything up to `generation` has been handed to the store.
    pub async fn flush(&self, generation: u64) -> Result<(), LoginGuardError> {
        let mut outcome = self.outcome.clone();
        let result = outcome
            .wait_for(|o| o.generation >= generation)
            .await
            .map_err(|_| LoginGuardError::Persistence("writer is not running".into()))?
            .error
            .clone();
        match result {
            None => Ok(()),
            Some(error) => Err(LoginGuardError::Persistence(error)),
        }
    }
}

impl Drop for PersistenceWriter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn upgrade_snapshot<T: Clone + PartialEq>(
    table: &Weak<StateTable<T>>,
) -> Option<(u64, std::collections::HashMap<String, T>)> {
    let table = table.upgrade()?;
    let generation = table.generation();
    Some((generation, table.snapshot()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::persistence::MemoryStore;

    #[tokio::test]
    async fn test_flush_waits_for_latest_generation() {
        let table = Arc::new(StateTable::<u32>::new());
        let store = Arc::new(MemoryStore::<u32>::new());
        let writer = PersistenceWriter::spawn("test", &table, store.clone());

        table.update("a", |slot| *slot = Some(1));
        table.update("b", |slot| *slot = Some(2));
        writer.flush(table.generation()).await.unwrap();

        let saved = store.load().await.unwrap();
        assert_eq!(saved, HashMap::from([("a".into(), 1), ("b".into(), 2)]));
    }

    #[tokio::test]
    async fn test_flush_without_changes_returns_immediately() {
        let table = Arc::new(StateTable::<u32>::new());
        let writer = PersistenceWriter::spawn("test", &table, Arc::new(MemoryStore::<u32>::new()));
        writer.flush(table.generation()).await.unwrap();
    }

    struct FlakyStore {
        fail: AtomicBool,
        inner: MemoryStore<u32>,
    }

    #[async_trait]
    impl StateStore<u32> for FlakyStore {
        async fn load(&self) -> Result<HashMap<String, u32>, LoginGuardError> {
            self.inner.load().await
        }

        async fn save(&self, entries: &HashMap<String, u32>) -> Result<(), LoginGuardError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(LoginGuardError::Persistence("store offline".into()));
            }
            self.inner.save(entries).await
        }
    }

    #[tokio::test]
    async fn test_save_failure_is_reported_by_flush_and_state_survives() {
        let table = Arc::new(StateTable::<u32>::new());
        let store = Arc::new(FlakyStore {
            fail: AtomicBool::new(true),
            inner: MemoryStore::new(),
        });
        let writer = PersistenceWriter::spawn("test", &table, store.clone());

        table.update("a", |slot| *slot = Some(1));
        assert!(writer.flush(table.generation()).await.is_err());
        assert_eq!(table.get("a"), Some(1));

        store.fail.store(false, Ordering::SeqCst);
        table.update("a", |slot| *slot = Some(2));
        writer.flush(table.generation()).await.unwrap();
        assert_eq!(
            store.load().await.unwrap(),
            HashMap::from([("a".into(), 2)])
        );
    }
}
