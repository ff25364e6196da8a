use std::cmp::Reverse;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::{Document, GoalStatus, Status, Task};
use crate::output::{self, Format};
use crate::store::repo::Repo;

const RECENT_COMPLETIONS: usize = 5;

#[derive(Debug, Serialize)]
pub struct Overview<'a> {
    pub active_goals_count: usize,
    pub tasks_by_status: Map<String, Value>,
    pub recent_completions: Vec<&'a Task>,
}

pub fn overview(doc: &Document) -> Overview<'_> {
    let active_goals_count = doc
        .goals
        .iter()
        .filter(|g| g.status == GoalStatus::Active)
        .count();

    let mut tasks_by_status = Map::new();
    for status in Status::ALL {
        let count = doc.tasks.iter().filter(|t| t.status == status).count();
        tasks_by_status.insert(status.to_string(), Value::from(count));
    }

    let mut recent_completions: Vec<&Task> = doc
        .tasks
        .iter()
        .filter(|t| t.status == Status::Completed)
        .collect();
    // undated completions sort last
    recent_completions.sort_by_key(|t| Reverse(t.completed_at));
    recent_completions.truncate(RECENT_COMPLETIONS);

    Overview {
        active_goals_count,
        tasks_by_status,
        recent_completions,
    }
}

pub fn run(root: &Path, format: Format) -> Result<()> {
    let repo = Repo::open(root)?;
    let overview = overview(&repo.doc);
    match format {
        Format::Json => output::print_success(serde_json::to_value(&overview)?)?,
        Format::Pretty => {
            println!("{} active goals", overview.active_goals_count.to_string().bold());
            for (status, count) in &overview.tasks_by_status {
                println!("  {status:12} {count}");
            }
            if !overview.recent_completions.is_empty() {
                println!("{}", "recently completed".bold());
                output::print_tasks(&overview.recent_completions);
            }
        }
    }
    Ok(())
}
