#[derive(thiserror::Error, Debug)]
pub enum LoginGuardError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state store {0:?} is in use by another process")]
    StoreLocked(std::path::PathBuf),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("deserialization failed: {0}")]
    DeserializeJson(#[from] serde_json::Error),
}

impl LoginGuardError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
