use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const TASKS_FILE: &str = "tasks.json";
pub const EXPORT_FILE: &str = "exported_tasks.csv";
pub const DEFAULT_PORT: u16 = 8501;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Config {
    /// `data_dir` falls back to the working directory.
    pub fn resolve(data_dir: Option<PathBuf>, port: Option<u16>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => expand_home(&dir),
            None => env::current_dir().context("Cannot determine the current directory")?,
        };
        Ok(Self {
            data_dir,
            port: port.unwrap_or(DEFAULT_PORT),
        })
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    pub fn export_path(&self) -> PathBuf {
        self.data_dir.join(EXPORT_FILE)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
