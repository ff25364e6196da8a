use std::path::Path;

use serde_json::json;

use crate::commands::require_goal;
use crate::error::Result;
use crate::model::{Document, Goal, GoalStatus, Priority, Status, Task};
use crate::output::{self, Format};
use crate::store::repo::Repo;

pub fn filter_goals(
    doc: &Document,
    status: Option<GoalStatus>,
    priority: Option<Priority>,
) -> Vec<&Goal> {
    doc.goals
        .iter()
        .filter(|g| status.is_none_or(|s| g.status == s))
        .filter(|g| priority.is_none_or(|p| g.priority == p))
        .collect()
}

/// Tasks in store order, optionally restricted to one goal.
pub fn filter_tasks<'a>(
    doc: &'a Document,
    goal_id: Option<&str>,
    status: Option<Status>,
    priority: Option<Priority>,
) -> Vec<&'a Task> {
    doc.tasks
        .iter()
        .filter(|t| goal_id.is_none_or(|id| t.goal_id.as_deref() == Some(id)))
        .filter(|t| status.is_none_or(|s| t.status == s))
        .filter(|t| priority.is_none_or(|p| t.priority == p))
        .collect()
}

pub fn goals(
    root: &Path,
    status: Option<GoalStatus>,
    priority: Option<Priority>,
    format: Format,
) -> Result<()> {
    let repo = Repo::open(root)?;
    let goals = filter_goals(&repo.doc, status, priority);
    match format {
        Format::Json => output::print_success(json!({ "goals": goals }))?,
        Format::Pretty => output::print_goals(&goals),
    }
    Ok(())
}

pub fn tasks(
    root: &Path,
    goal: Option<String>,
    status: Option<Status>,
    priority: Option<Priority>,
    format: Format,
) -> Result<()> {
    let repo = Repo::open(root)?;
    let goal = goal
        .as_deref()
        .map(|query| require_goal(&repo.doc, query))
        .transpose()?;
    let tasks = filter_tasks(&repo.doc, goal.map(|g| g.id.as_str()), status, priority);

    match format {
        Format::Json => output::print_success(json!({ "goal": goal, "tasks": tasks }))?,
        Format::Pretty => {
            if let Some(goal) = goal {
                output::print_goal(goal);
                println!();
            }
            output::print_tasks(&tasks);
        }
    }
    Ok(())
}
