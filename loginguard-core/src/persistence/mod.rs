//! Durable storage for tracker state.
//!
//! A store holds the whole key→state map of one tracker. Trackers never
//! call a store on their decision path: a background writer snapshots the
//! table after changes and hands it to [`StateStore::save`]. Failures are
//! logged and retried, the in-memory table stays authoritative.

mod file;
mod lock;
mod memory;
mod writer;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
pub use file::JsonFileStore;
pub use lock::StoreLock;
use loginguard_common::LoginGuardError;
pub use memory::MemoryStore;
pub(crate) use writer::PersistenceWriter;

#[async_trait]
pub trait StateStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    async fn load(&self) -> Result<HashMap<String, T>, LoginGuardError>;

    async fn save(&self, entries: &HashMap<String, T>) -> Result<(), LoginGuardError>;
}

/// `path` with `suffix` appended to its file name.
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}
