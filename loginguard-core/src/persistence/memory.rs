use std::collections::HashMap;

use async_trait::async_trait;
use loginguard_common::LoginGuardError;
use tokio::sync::Mutex;

use super::StateStore;

/// Keeps the last saved map in memory.
#[derive(Debug)]
pub struct MemoryStore<T> {
    entries: Mutex<HashMap<String, T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self::with_entries(HashMap::new())
    }

    pub fn with_entries(entries: HashMap<String, T>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> StateStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn load(&self) -> Result<HashMap<String, T>, LoginGuardError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn save(&self, entries: &HashMap<String, T>) -> Result<(), LoginGuardError> {
        *self.entries.lock().await = entries.clone();
        Ok(())
    }
}
