//! Markdown side outputs: the session snapshot and the working buffer.
//!
//! On-disk layout:
//!   - `SESSION-STATE.md` at the workspace root, overwritten per task mutation
//!   - `.protask/memory/working-buffer.md`, one line per change
//!   - `.protask/memory/YYYY-MM-DD.md`, the daily archive `flush` appends to

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::Layout;
use crate::error::Result;
use crate::events::{Event, velocity};
use crate::model::{Goal, Task};

pub struct Sinks {
    layout: Layout,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlushOutcome {
    pub lines_flushed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
}

impl Sinks {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Overwrite `SESSION-STATE.md` with the context of `task`.
    pub fn write_session_state(
        &self,
        task: &Task,
        goal: Option<&Goal>,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let path = self.layout.session_state_path();
        fs::write(&path, render_session_state(task, goal, action, now))?;
        tracing::debug!(path = %path.display(), task = %task.id, "session state written");
        Ok(())
    }

    /// Append `- LABEL (timestamp): details` to the working buffer.
    pub fn append_buffer(&self, label: &str, details: &str, now: DateTime<Utc>) -> Result<()> {
        fs::create_dir_all(self.layout.memory_dir())?;
        let line = format!("- {label} ({}): {details}\n", rfc3339(now));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.layout.buffer_path())?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Move the working buffer into today's archive under a `## Task Updates`
    /// heading, then truncate it. An empty or missing buffer flushes nothing.
    pub fn flush(&self, now: DateTime<Utc>) -> Result<FlushOutcome> {
        let buffer_path = self.layout.buffer_path();
        let content = read_or_empty(&buffer_path)?;
        let lines_flushed = content.lines().filter(|l| !l.trim().is_empty()).count();
        if lines_flushed == 0 {
            return Ok(FlushOutcome {
                lines_flushed: 0,
                archive: None,
            });
        }

        let archive = self.layout.daily_archive_path(now.date_naive());
        let mut section = String::from("\n## Task Updates\n");
        section.push_str(&content);
        if !content.ends_with('\n') {
            section.push('\n');
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&archive)?;
        file.write_all(section.as_bytes())?;
        fs::write(&buffer_path, "")?;

        tracing::info!(lines = lines_flushed, archive = %archive.display(), "working buffer flushed");
        Ok(FlushOutcome {
            lines_flushed,
            archive: Some(archive),
        })
    }
}

fn read_or_empty(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    Ok(fs::read_to_string(path)?)
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The "Next Action" line recorded for a task event.
pub fn session_action(event: &Event) -> String {
    match event {
        Event::ProgressChange {
            old_progress,
            new_progress,
            ..
        } => format!("Progress marked: {old_progress}% → {new_progress}%"),
        Event::TimeLog {
            minutes_logged,
            new_total,
            ..
        } => format!("Logged {minutes_logged} min (total: {new_total} min)"),
        Event::StatusChange {
            reason: Some(reason),
            ..
        } => format!("BLOCKED: {reason}"),
        Event::TaskCompleted { .. } => "Task completed; pick the next task".to_string(),
        Event::TaskCreated { .. } => "Start this task when its dependencies are met".to_string(),
        _ => "Continue with current task or mark as complete".to_string(),
    }
}

pub fn render_session_state(
    task: &Task,
    goal: Option<&Goal>,
    action: &str,
    now: DateTime<Utc>,
) -> String {
    let estimate = task.estimate_minutes.unwrap_or(0);
    let pace = velocity(task.actual_minutes, task.estimate_minutes)
        .map(|v| format!(" ({v})"))
        .unwrap_or_default();
    let notes = if task.notes.is_empty() {
        "None"
    } else {
        task.notes.as_str()
    };

    let mut out = String::new();
    out.push_str("# SESSION-STATE.md - Active Working Memory\n");
    out.push_str(&format!("Last updated: {}\n\n", rfc3339(now)));

    out.push_str("## Current Task\n");
    out.push_str(&format!("- ID: {}\n", task.id));
    out.push_str(&format!("- Title: {}\n", task.title));
    out.push_str(&format!("- Status: {}\n", task.status));
    out.push_str(&format!("- Progress: {}%\n", task.progress));
    out.push_str(&format!("- Estimated: {estimate} min\n"));
    out.push_str(&format!("- Actual logged: {} min{pace}\n\n", task.actual_minutes));

    out.push_str("## Goal Context\n");
    match goal {
        Some(goal) => {
            out.push_str(&format!("- ID: {}\n", goal.id));
            out.push_str(&format!("- Title: {}\n", goal.title));
            out.push_str(&format!("- Priority: {}\n\n", goal.priority));
        }
        None => out.push_str("- None\n\n"),
    }

    out.push_str("## Task Details\n");
    out.push_str(&format!("- Created: {}\n", rfc3339(task.created_at)));
    out.push_str(&format!("- Updated: {}\n", rfc3339(task.updated_at)));
    out.push_str(&format!("- Notes: {notes}\n\n"));

    out.push_str("## Blockers\n");
    out.push_str(&format!(
        "- {}\n\n",
        task.blocked_reason.as_deref().unwrap_or("None")
    ));

    out.push_str("## Next Action\n");
    out.push_str(action);
    out.push('\n');
    out
}
