use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::commands::{require_goal, require_task};
use crate::deps::validate_new_edges;
use crate::error::Result;
use crate::events::Event;
use crate::model::{Goal, GoalStatus, Priority, Status, Task};
use crate::output::{self, Format};
use crate::store::repo::Repo;

/// Overwrite status and priority, append notes, and add dependency edges.
///
/// Setting `completed` here does not stamp `completed_at`; use
/// `complete-task` for that, or let the health check repair it.
pub fn update_task(
    repo: &mut Repo,
    id: &str,
    status: Option<Status>,
    priority: Option<Priority>,
    notes: Option<String>,
    depends_on: Vec<String>,
    now: DateTime<Utc>,
) -> Result<Task> {
    let task = require_task(&repo.doc, id)?;
    let event = Event::task_updated(task, status, priority, notes, depends_on, now);
    if let Event::TaskUpdated {
        added_dependencies, ..
    } = &event
    {
        validate_new_edges(&repo.doc, id, added_dependencies)?;
    }

    repo.commit(event, now)?;
    Ok(require_task(&repo.doc, id)?.clone())
}

pub fn update_goal(
    repo: &mut Repo,
    query: &str,
    status: Option<GoalStatus>,
    priority: Option<Priority>,
    context: Option<String>,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let goal = require_goal(&repo.doc, query)?;
    let id = goal.id.clone();
    let event = Event::goal_updated(goal, status, priority, context, now);
    repo.commit(event, now)?;
    Ok(require_goal(&repo.doc, &id)?.clone())
}

pub fn run_task(
    root: &Path,
    id: &str,
    status: Option<Status>,
    priority: Option<Priority>,
    notes: Option<String>,
    depends_on: Vec<String>,
    format: Format,
) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let task = update_task(&mut repo, id, status, priority, notes, depends_on, Utc::now())?;
    match format {
        Format::Json => output::print_success(json!({ "task": task }))?,
        Format::Pretty => output::print_task(&task, repo.doc.goal_of(&task)),
    }
    Ok(())
}

pub fn run_goal(
    root: &Path,
    query: &str,
    status: Option<GoalStatus>,
    priority: Option<Priority>,
    context: Option<String>,
    format: Format,
) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let goal = update_goal(&mut repo, query, status, priority, context, Utc::now())?;
    match format {
        Format::Json => output::print_success(json!({ "goal": goal }))?,
        Format::Pretty => output::print_goal(&goal),
    }
    Ok(())
}
