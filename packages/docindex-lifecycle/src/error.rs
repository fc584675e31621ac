use docindex_store::{ErrorKind, StoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LifecycleError>;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid index descriptor: {field} {reason}")]
    InvalidDescriptor { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Group aborted: {0}")]
    GroupAborted(String),
}

impl LifecycleError {
    pub fn invalid_descriptor(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    /// Transport classification; anything not raised by the store is `Generic`
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Store(err) => err.kind,
            _ => ErrorKind::Generic,
        }
    }

    /// Store "not found" response
    pub fn is_not_found(&self) -> bool {
        matches!(self, LifecycleError::Store(err) if err.is_not_found())
    }
}
