//! Workspace discovery and the optional `.protask/config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ProtaskError, Result};

pub const DATA_DIR: &str = ".protask";
pub const ROOT_ENV: &str = "PROTASK_ROOT";

/// Tunables read from `.protask/config.json`. Missing fields take defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    /// Re-apply WAL entries the store has not seen yet when opening.
    pub replay_wal: bool,
    /// Overwrite `SESSION-STATE.md` after task mutations.
    pub session_state: bool,
    /// Append one-line change summaries to the working buffer.
    pub working_buffer: bool,
    /// `actual_minutes` above this multiple of the estimate is reported as an anomaly.
    pub time_anomaly_factor: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            replay_wal: true,
            session_state: true,
            working_buffer: true,
            time_anomaly_factor: 10,
        }
    }
}

impl Config {
    /// Load config from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|source| ProtaskError::MalformedConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(path, json)?;
        Ok(())
    }
}

/// Where every file of a workspace lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join("tasks.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir().join("tasks.lock")
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir().join("config.json")
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.data_dir().join("memory")
    }

    pub fn wal_path(&self, day: NaiveDate) -> PathBuf {
        self.memory_dir()
            .join(format!("WAL-{}.log", day.format("%Y-%m-%d")))
    }

    pub fn buffer_path(&self) -> PathBuf {
        self.memory_dir().join("working-buffer.md")
    }

    pub fn daily_archive_path(&self, day: NaiveDate) -> PathBuf {
        self.memory_dir()
            .join(format!("{}.md", day.format("%Y-%m-%d")))
    }

    pub fn session_state_path(&self) -> PathBuf {
        self.root.join("SESSION-STATE.md")
    }
}

/// Resolve the workspace root.
///
/// Order: explicit `--root`, then `$PROTASK_ROOT`, then the nearest ancestor
/// of the current directory containing `.protask/`, then the current directory.
pub fn find_workspace_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    let cwd = std::env::current_dir()?;
    Ok(find_data_dir_ancestor(&cwd).unwrap_or(cwd))
}

fn find_data_dir_ancestor(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(DATA_DIR).is_dir() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}
