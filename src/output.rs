use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde_json::{Map, Value};

use crate::error::{ProtaskError, Result};
use crate::model::{Goal, GoalStatus, Priority, Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
}

/// Print one result object on stdout with `"success": true` added.
pub fn print_success(body: Value) -> Result<()> {
    let mut object = Map::new();
    object.insert("success".into(), Value::Bool(true));
    match body {
        Value::Object(fields) => object.extend(fields),
        Value::Null => {}
        other => {
            object.insert("result".into(), other);
        }
    }
    println!("{}", serde_json::to_string_pretty(&Value::Object(object))?);
    Ok(())
}

/// Report a failed command on stderr.
pub fn print_error(err: &ProtaskError, format: Format) {
    match format {
        Format::Json => eprintln!(
            "{}",
            serde_json::json!({
                "success": false,
                "error": err.to_string(),
                "code": err.code(),
            })
        ),
        Format::Pretty => eprintln!("{} {err}", "error:".red().bold()),
    }
}

pub fn status_label(status: Status) -> ColoredString {
    let text = status.to_string();
    match status {
        Status::Pending => text.normal(),
        Status::InProgress => text.cyan(),
        Status::Blocked => text.red(),
        Status::NeedsInput => text.yellow(),
        Status::Completed => text.green(),
        Status::Cancelled => text.dimmed(),
    }
}

fn goal_status_label(status: GoalStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        GoalStatus::Active => text.cyan(),
        GoalStatus::Paused => text.yellow(),
        GoalStatus::Completed => text.green(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    let text = priority.to_string();
    match priority {
        Priority::High => text.red().bold(),
        Priority::Medium => text.normal(),
        Priority::Low => text.dimmed(),
    }
}

pub fn print_task(task: &Task, goal: Option<&Goal>) {
    println!(
        "[{}] {} ({})",
        task.id.bold(),
        task.title,
        status_label(task.status)
    );
    println!(
        "  priority: {} | progress: {}%",
        priority_label(task.priority),
        task.progress
    );
    match goal {
        Some(goal) => println!("  goal: {} {}", goal.id, goal.title),
        None => {
            if let Some(ref goal_id) = task.goal_id {
                println!("  goal: {goal_id}");
            }
        }
    }
    if task.estimate_minutes.is_some() || task.actual_minutes > 0 {
        let estimate = task
            .estimate_minutes
            .map(|m| format!("{m} min"))
            .unwrap_or_else(|| "-".into());
        println!("  time: {} min logged / {estimate} estimated", task.actual_minutes);
    }
    if !task.depends_on.is_empty() {
        println!("  depends on: {}", task.depends_on.join(", "));
    }
    if let Some(ref reason) = task.blocked_reason {
        println!("  blocked: {}", reason.red());
    }
    if task.recurring {
        println!("  recurring");
    }
    for line in task.notes.lines() {
        println!("  > {line}");
    }
}

pub fn print_tasks(tasks: &[&Task]) {
    if tasks.is_empty() {
        println!("{}", "no tasks".dimmed());
        return;
    }
    for task in tasks {
        println!(
            "{:14} {:12} {:6} {:>3}%  {}",
            task.id,
            status_label(task.status),
            priority_label(task.priority),
            task.progress,
            task.title
        );
    }
}

pub fn print_goal(goal: &Goal) {
    println!(
        "[{}] {} ({}, {})",
        goal.id.bold(),
        goal.title,
        goal_status_label(goal.status),
        priority_label(goal.priority)
    );
    if let Some(ref context) = goal.context
        && !context.is_empty()
    {
        println!("  {context}");
    }
}

pub fn print_goals(goals: &[&Goal]) {
    if goals.is_empty() {
        println!("{}", "no goals".dimmed());
        return;
    }
    for goal in goals {
        print_goal(goal);
    }
}

pub fn print_message(message: &str) {
    println!("{message}");
}
