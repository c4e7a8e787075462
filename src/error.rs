use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Invalid task: {0}")]
    Validation(String),

    #[error("Task '{id}' not found")]
    TaskNotFound { id: String },

    #[error("Task position {index} is out of range (collection has {len} tasks)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Storage file {path:?} is corrupt and was left untouched: {source}")]
    StorageCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read storage file {path:?}: {source}")]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write storage file {path:?}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write export file {path:?}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TaskNotFound { .. } | Self::IndexOutOfRange { .. })
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
