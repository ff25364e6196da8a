use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtaskError {
    #[error("protask already initialized in this workspace")]
    AlreadyInitialized,

    #[error("goal not found: {0}")]
    GoalNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("dependency cycle: task {0} would depend on itself (directly or transitively)")]
    CycleDetected(String),

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("malformed store {}: {source}", path.display())]
    MalformedStore {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("malformed config {}: {source}", path.display())]
    MalformedConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtaskError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized => "already_initialized",
            Self::GoalNotFound(_) => "goal_not_found",
            Self::TaskNotFound(_) => "task_not_found",
            Self::CycleDetected(_) => "cycle_detected",
            Self::Locked(_) => "locked",
            Self::MalformedStore { .. } => "malformed_store",
            Self::MalformedConfig { .. } => "malformed_config",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtaskError>;
