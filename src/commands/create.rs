use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::commands::require_goal;
use crate::deps::validate_new_edges;
use crate::error::Result;
use crate::events::Event;
use crate::model::{Goal, GoalStatus, Priority, Status, Task};
use crate::output::{self, Format};
use crate::store::repo::Repo;

/// Arguments for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Goal id or title fragment.
    pub goal: String,
    pub title: String,
    /// Defaults to the goal's priority.
    pub priority: Option<Priority>,
    pub depends_on: Vec<String>,
    pub estimate_minutes: Option<u32>,
    pub recurring: bool,
}

pub fn add_goal(
    repo: &mut Repo,
    title: String,
    priority: Priority,
    context: Option<String>,
    status: GoalStatus,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let goal = Goal {
        id: repo.doc.allocate_id("goal"),
        title,
        priority,
        context: context.filter(|c| !c.trim().is_empty()),
        status,
        created_at: now,
    };
    repo.commit(Event::GoalCreated { goal: goal.clone() }, now)?;
    Ok(goal)
}

pub fn add_task(repo: &mut Repo, new: NewTask, now: DateTime<Utc>) -> Result<Task> {
    let goal = require_goal(&repo.doc, &new.goal)?;
    let mut task = Task {
        id: repo.doc.allocate_id("task"),
        goal_id: Some(goal.id.clone()),
        title: new.title,
        priority: new.priority.unwrap_or(goal.priority),
        status: Status::Pending,
        created_at: now,
        updated_at: now,
        completed_at: None,
        notes: String::new(),
        depends_on: new.depends_on,
        estimate_minutes: new.estimate_minutes,
        actual_minutes: 0,
        progress: 0,
        blocked_reason: None,
        recurring: new.recurring,
    };
    task.normalize();
    validate_new_edges(&repo.doc, &task.id, &task.depends_on)?;

    repo.commit(Event::TaskCreated { task: task.clone() }, now)?;
    Ok(task)
}

pub fn run_goal(
    root: &Path,
    title: String,
    priority: Priority,
    context: Option<String>,
    status: GoalStatus,
    format: Format,
) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let goal = add_goal(&mut repo, title, priority, context, status, Utc::now())?;
    match format {
        Format::Json => output::print_success(json!({ "goal": goal }))?,
        Format::Pretty => output::print_goal(&goal),
    }
    Ok(())
}

pub fn run_task(root: &Path, new: NewTask, format: Format) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let task = add_task(&mut repo, new, Utc::now())?;
    match format {
        Format::Json => output::print_success(json!({ "task": task }))?,
        Format::Pretty => output::print_task(&task, repo.doc.goal_of(&task)),
    }
    Ok(())
}
