pub mod create;
pub mod edit;
pub mod flush;
pub mod health;
pub mod init;
pub mod lifecycle;
pub mod list;
pub mod log;
pub mod next;
pub mod status;

use crate::error::{ProtaskError, Result};
use crate::model::{Document, Goal, Task};

pub(crate) fn require_task<'a>(doc: &'a Document, id: &str) -> Result<&'a Task> {
    doc.task(id)
        .ok_or_else(|| ProtaskError::TaskNotFound(id.to_string()))
}

/// Resolve a goal by id or title fragment.
pub(crate) fn require_goal<'a>(doc: &'a Document, query: &str) -> Result<&'a Goal> {
    doc.find_goal(query)
        .ok_or_else(|| ProtaskError::GoalNotFound(query.to_string()))
}
