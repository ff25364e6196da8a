use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::commands::require_task;
use crate::error::Result;
use crate::events::{Event, velocity};
use crate::model::Task;
use crate::output::{self, Format};
use crate::store::repo::Repo;

/// Build an event from the current task, commit it, and return the updated task.
fn transition(
    repo: &mut Repo,
    id: &str,
    now: DateTime<Utc>,
    build: impl FnOnce(&Task) -> Event,
) -> Result<Task> {
    let event = build(require_task(&repo.doc, id)?);
    repo.commit(event, now)?;
    Ok(require_task(&repo.doc, id)?.clone())
}

pub fn complete(repo: &mut Repo, id: &str, notes: Option<String>, now: DateTime<Utc>) -> Result<Task> {
    transition(repo, id, now, |task| Event::completed(task, notes, now))
}

pub fn mark_progress(
    repo: &mut Repo,
    id: &str,
    progress: u8,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<Task> {
    transition(repo, id, now, |task| Event::progress(task, progress, notes, now))
}

pub fn log_time(
    repo: &mut Repo,
    id: &str,
    minutes: u32,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<Task> {
    transition(repo, id, now, |task| Event::time_log(task, minutes, notes, now))
}

pub fn mark_blocked(repo: &mut Repo, id: &str, reason: String, now: DateTime<Utc>) -> Result<Task> {
    transition(repo, id, now, |task| Event::blocked(task, reason, now))
}

fn print_task(repo: &Repo, task: &Task, extra: serde_json::Value, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let mut body = json!({ "task": task });
            if let (Some(fields), serde_json::Value::Object(extra)) = (body.as_object_mut(), extra) {
                fields.extend(extra);
            }
            output::print_success(body)?;
        }
        Format::Pretty => output::print_task(task, repo.doc.goal_of(task)),
    }
    Ok(())
}

pub fn run_complete(root: &Path, id: &str, notes: Option<String>, format: Format) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let task = complete(&mut repo, id, notes, Utc::now())?;
    print_task(&repo, &task, json!({}), format)
}

pub fn run_progress(
    root: &Path,
    id: &str,
    progress: u8,
    notes: Option<String>,
    format: Format,
) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let old_progress = require_task(&repo.doc, id)?.progress;
    let task = mark_progress(&mut repo, id, progress, notes, Utc::now())?;
    let change = format!("{old_progress}% → {}%", task.progress);
    print_task(&repo, &task, json!({ "progress_change": change }), format)
}

pub fn run_log_time(
    root: &Path,
    id: &str,
    minutes: u32,
    notes: Option<String>,
    format: Format,
) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let task = log_time(&mut repo, id, minutes, notes, Utc::now())?;
    let pace = velocity(task.actual_minutes, task.estimate_minutes);
    if format == Format::Pretty
        && let Some(ref pace) = pace
    {
        output::print_message(pace);
    }
    print_task(
        &repo,
        &task,
        json!({
            "minutes_logged": minutes,
            "total_actual": task.actual_minutes,
            "estimate": task.estimate_minutes,
            "velocity": pace,
        }),
        format,
    )
}

pub fn run_blocked(root: &Path, id: &str, reason: String, format: Format) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let old_status = require_task(&repo.doc, id)?.status;
    let task = mark_blocked(&mut repo, id, reason.clone(), Utc::now())?;
    let change = format!("{old_status} → {}", task.status);
    print_task(
        &repo,
        &task,
        json!({ "status_change": change, "reason": reason }),
        format,
    )
}
