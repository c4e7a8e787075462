use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{TaskError, TaskResult};
use crate::task::Task;

pub struct Store {
    pub path: PathBuf,
}

impl Store {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, tasks: &[Task]) -> TaskResult<()> {
        let content = serde_json::to_string_pretty(tasks).map_err(|e| TaskError::StorageWrite {
            path: self.path.clone(),
            source: e.into(),
        })?;
        write_atomic(&self.path, content.as_bytes()).map_err(|source| TaskError::StorageWrite {
            path: self.path.clone(),
            source,
        })?;
        debug!("Saved {} tasks to {:?}", tasks.len(), self.path);
        Ok(())
    }

    /// A missing file is an empty collection; an unreadable one is an error.
    pub fn load(&self) -> TaskResult<Vec<Task>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No storage at {:?}, starting empty", self.path);
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(TaskError::StorageRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let tasks: Vec<Task> =
            serde_json::from_str(&content).map_err(|source| TaskError::StorageCorrupt {
                path: self.path.clone(),
                source,
            })?;
        debug!("Loaded {} tasks from {:?}", tasks.len(), self.path);
        Ok(tasks)
    }
}

/// Write to a sibling temp file and rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
