use std::collections::HashMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use loginguard_common::helpers::fs::{secure_directory, secure_file};
use loginguard_common::LoginGuardError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{sibling_path, StateStore};

/// Stores the map as a single JSON object, replaced atomically on every save.
#[derive(Debug)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _state: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            _state: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        sibling_path(&self.path, ".tmp")
    }
}

#[async_trait]
impl<T> StateStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self) -> Result<HashMap<String, T>, LoginGuardError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "State file does not exist yet");
                return Ok(HashMap::new());
            }
            Err(error) => return Err(error.into()),
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save(&self, entries: &HashMap<String, T>) -> Result<(), LoginGuardError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if tokio::fs::metadata(parent).await.is_err() {
                tokio::fs::create_dir_all(parent).await?;
                secure_directory(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(entries)?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, data).await?;
        secure_file(&temp_path)?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
