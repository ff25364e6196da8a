use std::path::Path;

use serde_json::json;

use crate::commands::require_goal;
use crate::error::Result;
use crate::model::Document;
use crate::output::{self, Format};
use crate::schedule::{NextFilter, next_task};
use crate::store::repo::Repo;

/// A `goal_` id is matched literally, even when no such goal exists, so
/// tasks with a dangling goal stay selectable. Anything else must name a goal.
pub fn goal_filter(doc: &Document, query: &str) -> Result<String> {
    if query.starts_with("goal_") && doc.goal(query).is_none() {
        return Ok(query.to_string());
    }
    Ok(require_goal(doc, query)?.id.clone())
}

pub fn run(
    root: &Path,
    goal: Option<String>,
    max_estimate: Option<u32>,
    format: Format,
) -> Result<()> {
    let repo = Repo::open(root)?;
    let goal_id = goal
        .as_deref()
        .map(|query| goal_filter(&repo.doc, query))
        .transpose()?;
    let filter = NextFilter {
        goal_id,
        max_estimate,
    };

    match (next_task(&repo.doc, &filter), format) {
        (Some((task, goal)), Format::Json) => {
            output::print_success(json!({ "task": task, "goal": goal }))?
        }
        (Some((task, goal)), Format::Pretty) => output::print_task(task, goal),
        (None, Format::Json) => output::print_success(json!({
            "task": null,
            "message": "No tasks available",
        }))?,
        (None, Format::Pretty) => output::print_message("No tasks available"),
    }
    Ok(())
}
