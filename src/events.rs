//! Task and goal mutations as replayable events.
//!
//! Every mutating command builds an [`Event`] from the current document,
//! appends it to the WAL, and only then calls [`Event::apply`]. WAL replay
//! goes through the same `apply`, so a replayed entry lands exactly like the
//! live one did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProtaskError, Result};
use crate::model::{Document, Goal, GoalStatus, Priority, Status, Task};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", content = "content", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    GoalCreated {
        goal: Goal,
    },
    GoalUpdated {
        goal_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<Change<GoalStatus>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<Change<Priority>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<Change<Option<String>>>,
        timestamp: DateTime<Utc>,
    },
    TaskCreated {
        task: Task,
    },
    TaskUpdated {
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<Change<Status>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<Change<Priority>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        added_dependencies: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: String,
        old_status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        completed_at: DateTime<Utc>,
    },
    ProgressChange {
        task_id: String,
        old_progress: u8,
        new_progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        timestamp: DateTime<Utc>,
    },
    TimeLog {
        task_id: String,
        minutes_logged: u32,
        old_total: u32,
        new_total: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        timestamp: DateTime<Utc>,
    },
    StatusChange {
        task_id: String,
        old_status: Status,
        new_status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
    HealthCheck {
        issues_found: usize,
        anomalies_found: usize,
        auto_fixes_applied: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        repairs: Vec<Repair>,
        timestamp: DateTime<Utc>,
    },
}

/// Old and new value of a single field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Change<T> {
    pub old: T,
    pub new: T,
}

/// A deterministic fix produced by the health checker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Repair {
    ClearRecurring {
        task_id: String,
    },
    SetProgress {
        task_id: String,
        old: u8,
        new: u8,
    },
    SetCompletedAt {
        task_id: String,
        old: Option<DateTime<Utc>>,
        new: DateTime<Utc>,
    },
}

impl Repair {
    pub fn task_id(&self) -> &str {
        match self {
            Self::ClearRecurring { task_id }
            | Self::SetProgress { task_id, .. }
            | Self::SetCompletedAt { task_id, .. } => task_id,
        }
    }

    fn apply(&self, task: &mut Task) {
        match self {
            Self::ClearRecurring { .. } => task.recurring = false,
            Self::SetProgress { new, .. } => task.progress = *new,
            Self::SetCompletedAt { new, .. } => task.completed_at = Some(*new),
        }
    }
}

/// Status after progress moves to `progress`. Reaching 100 never completes a task.
fn status_after_progress(current: Status, progress: u8) -> Status {
    if progress >= 100 && current != Status::Completed {
        Status::InProgress
    } else if progress > 0 && current == Status::Pending {
        Status::InProgress
    } else {
        current
    }
}

fn task_mut<'a>(doc: &'a mut Document, id: &str) -> Result<&'a mut Task> {
    doc.task_mut(id)
        .ok_or_else(|| ProtaskError::TaskNotFound(id.to_string()))
}

fn append_optional_note(task: &mut Task, notes: &Option<String>) {
    if let Some(note) = notes {
        task.append_note(note);
    }
}

impl Event {
    pub fn progress(task: &Task, progress: u8, notes: Option<String>, now: DateTime<Utc>) -> Self {
        Self::ProgressChange {
            task_id: task.id.clone(),
            old_progress: task.progress,
            new_progress: progress,
            notes,
            timestamp: now,
        }
    }

    pub fn time_log(task: &Task, minutes: u32, notes: Option<String>, now: DateTime<Utc>) -> Self {
        Self::TimeLog {
            task_id: task.id.clone(),
            minutes_logged: minutes,
            old_total: task.actual_minutes,
            new_total: task.actual_minutes.saturating_add(minutes),
            notes,
            timestamp: now,
        }
    }

    pub fn blocked(task: &Task, reason: String, now: DateTime<Utc>) -> Self {
        Self::StatusChange {
            task_id: task.id.clone(),
            old_status: task.status,
            new_status: Status::Blocked,
            reason: Some(reason),
            timestamp: now,
        }
    }

    pub fn completed(task: &Task, notes: Option<String>, now: DateTime<Utc>) -> Self {
        Self::TaskCompleted {
            task_id: task.id.clone(),
            old_status: task.status,
            notes,
            completed_at: now,
        }
    }

    /// Free-form task update. Dependencies already present are not re-added.
    pub fn task_updated(
        task: &Task,
        status: Option<Status>,
        priority: Option<Priority>,
        notes: Option<String>,
        depends_on: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut added_dependencies: Vec<String> = Vec::new();
        for dep in depends_on {
            let dep = dep.trim();
            if !dep.is_empty()
                && !task.depends_on.iter().any(|d| d == dep)
                && !added_dependencies.iter().any(|d| d == dep)
            {
                added_dependencies.push(dep.to_string());
            }
        }
        Self::TaskUpdated {
            task_id: task.id.clone(),
            status: status.map(|new| Change {
                old: task.status,
                new,
            }),
            priority: priority.map(|new| Change {
                old: task.priority,
                new,
            }),
            notes,
            added_dependencies,
            timestamp: now,
        }
    }

    pub fn goal_updated(
        goal: &Goal,
        status: Option<GoalStatus>,
        priority: Option<Priority>,
        context: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::GoalUpdated {
            goal_id: goal.id.clone(),
            status: status.map(|new| Change {
                old: goal.status,
                new,
            }),
            priority: priority.map(|new| Change {
                old: goal.priority,
                new,
            }),
            context: context.map(|new| Change {
                old: goal.context.clone(),
                new: Some(new),
            }),
            timestamp: now,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::GoalCreated { .. } => "GOAL_CREATED",
            Self::GoalUpdated { .. } => "GOAL_UPDATED",
            Self::TaskCreated { .. } => "TASK_CREATED",
            Self::TaskUpdated { .. } => "TASK_UPDATED",
            Self::TaskCompleted { .. } => "TASK_COMPLETED",
            Self::ProgressChange { .. } => "PROGRESS_CHANGE",
            Self::TimeLog { .. } => "TIME_LOG",
            Self::StatusChange { .. } => "STATUS_CHANGE",
            Self::HealthCheck { .. } => "HEALTH_CHECK",
        }
    }

    /// The task this event touches, if any.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskCreated { task } => Some(&task.id),
            Self::TaskUpdated { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::ProgressChange { task_id, .. }
            | Self::TimeLog { task_id, .. }
            | Self::StatusChange { task_id, .. } => Some(task_id),
            Self::GoalCreated { .. } | Self::GoalUpdated { .. } | Self::HealthCheck { .. } => None,
        }
    }

    /// Whether `task_id` is touched by this event, including health repairs.
    pub fn mentions_task(&self, task_id: &str) -> bool {
        match self {
            Self::HealthCheck { repairs, .. } => repairs.iter().any(|r| r.task_id() == task_id),
            _ => self.task_id() == Some(task_id),
        }
    }

    /// Events that change nothing when applied.
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::HealthCheck { repairs, .. } if repairs.is_empty())
    }

    /// Working-buffer label and one-line summary.
    pub fn summary(&self) -> (&'static str, String) {
        match self {
            Self::GoalCreated { goal } => ("GOAL", format!("{}: created \"{}\"", goal.id, goal.title)),
            Self::GoalUpdated { goal_id, .. } => ("GOAL", format!("{goal_id}: updated")),
            Self::TaskCreated { task } => ("TASK", format!("{}: created \"{}\"", task.id, task.title)),
            Self::TaskUpdated {
                task_id, status, ..
            } => match status {
                Some(change) => ("UPDATE", format!("{task_id}: {} → {}", change.old, change.new)),
                None => ("UPDATE", format!("{task_id}: updated")),
            },
            Self::TaskCompleted {
                task_id, old_status, ..
            } => ("COMPLETED", format!("{task_id}: {old_status} → completed")),
            Self::ProgressChange {
                task_id,
                old_progress,
                new_progress,
                ..
            } => ("PROGRESS", format!("{task_id}: {old_progress}% → {new_progress}%")),
            Self::TimeLog {
                task_id,
                minutes_logged,
                new_total,
                ..
            } => (
                "TIME_LOG",
                format!("{task_id}: +{minutes_logged} min (total: {new_total} min)"),
            ),
            Self::StatusChange {
                task_id,
                new_status,
                reason,
                ..
            } => match (new_status, reason) {
                (Status::Blocked, Some(reason)) => ("BLOCKED", format!("{task_id}: {reason}")),
                _ => ("STATUS", format!("{task_id}: → {new_status}")),
            },
            Self::HealthCheck {
                issues_found,
                auto_fixes_applied,
                ..
            } => (
                "HEALTH_CHECK",
                format!("found {issues_found} issues, auto-fixed {auto_fixes_applied}"),
            ),
        }
    }

    /// Apply this event to `doc`.
    pub fn apply(&self, doc: &mut Document) -> Result<()> {
        match self {
            Self::GoalCreated { goal } => {
                if doc.goal(&goal.id).is_none() {
                    doc.goals.push(goal.clone());
                }
            }
            Self::GoalUpdated {
                goal_id,
                status,
                priority,
                context,
                ..
            } => {
                let goal = doc
                    .goal_mut(goal_id)
                    .ok_or_else(|| ProtaskError::GoalNotFound(goal_id.clone()))?;
                if let Some(change) = status {
                    goal.status = change.new;
                }
                if let Some(change) = priority {
                    goal.priority = change.new;
                }
                if let Some(change) = context {
                    goal.context = change.new.clone();
                }
            }
            Self::TaskCreated { task } => {
                if doc.task(&task.id).is_none() {
                    doc.tasks.push(task.clone());
                }
            }
            Self::TaskUpdated {
                task_id,
                status,
                priority,
                notes,
                added_dependencies,
                timestamp,
            } => {
                let task = task_mut(doc, task_id)?;
                if let Some(change) = status {
                    task.status = change.new;
                }
                if let Some(change) = priority {
                    task.priority = change.new;
                }
                append_optional_note(task, notes);
                task.depends_on.extend(added_dependencies.iter().cloned());
                task.normalize();
                task.updated_at = *timestamp;
            }
            Self::TaskCompleted {
                task_id,
                notes,
                completed_at,
                ..
            } => {
                let task = task_mut(doc, task_id)?;
                task.status = Status::Completed;
                task.completed_at = Some(*completed_at);
                append_optional_note(task, notes);
                task.updated_at = *completed_at;
            }
            Self::ProgressChange {
                task_id,
                new_progress,
                notes,
                timestamp,
                ..
            } => {
                let task = task_mut(doc, task_id)?;
                task.progress = *new_progress;
                task.status = status_after_progress(task.status, *new_progress);
                append_optional_note(task, notes);
                task.updated_at = *timestamp;
            }
            Self::TimeLog {
                task_id,
                new_total,
                notes,
                timestamp,
                ..
            } => {
                let task = task_mut(doc, task_id)?;
                task.actual_minutes = *new_total;
                if task.status == Status::Pending && *new_total > 0 {
                    task.status = Status::InProgress;
                }
                append_optional_note(task, notes);
                task.updated_at = *timestamp;
            }
            Self::StatusChange {
                task_id,
                new_status,
                reason,
                timestamp,
                ..
            } => {
                let task = task_mut(doc, task_id)?;
                task.status = *new_status;
                if reason.is_some() {
                    task.blocked_reason = reason.clone();
                }
                task.updated_at = *timestamp;
            }
            Self::HealthCheck { repairs, .. } => {
                // every repair must resolve before any task is touched
                if let Some(missing) = repairs.iter().find(|r| doc.task(r.task_id()).is_none()) {
                    return Err(ProtaskError::TaskNotFound(missing.task_id().to_string()));
                }
                for repair in repairs {
                    let task = task_mut(doc, repair.task_id())?;
                    repair.apply(task);
                }
            }
        }
        Ok(())
    }
}

/// Human-readable pace of `actual` against `estimate`, when an estimate exists.
pub fn velocity(actual: u32, estimate: Option<u32>) -> Option<String> {
    let estimate = estimate.filter(|e| *e > 0)?;
    let ratio = f64::from(actual) / f64::from(estimate);
    let text = if ratio < 1.0 {
        format!("{}% faster than estimate", ((1.0 - ratio) * 100.0) as u32)
    } else if ratio > 1.0 {
        format!("{}% slower than estimate", ((ratio - 1.0) * 100.0) as u32)
    } else {
        "on pace with estimate".to_string()
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc_with, make_task};
    use chrono::Duration;

    #[test]
    fn progress_sets_value_and_promotes_pending() {
        let mut doc = doc_with(vec![make_task("task_a")]);
        let now = Utc::now();
        let event = Event::progress(&doc.tasks[0], 40, Some("halfway-ish".into()), now);
        event.apply(&mut doc).unwrap();

        let task = &doc.tasks[0];
        assert_eq!(task.progress, 40);
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.notes, "halfway-ish");
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn full_progress_does_not_complete() {
        let mut doc = doc_with(vec![make_task("task_a")]);
        doc.tasks[0].status = Status::Blocked;
        Event::progress(&doc.tasks[0], 100, None, Utc::now())
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc.tasks[0].status, Status::InProgress);
        assert!(doc.tasks[0].completed_at.is_none());
    }

    #[test]
    fn progress_leaves_completed_task_completed() {
        let mut doc = doc_with(vec![make_task("task_a")]);
        doc.tasks[0].status = Status::Completed;
        Event::progress(&doc.tasks[0], 100, None, Utc::now())
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc.tasks[0].status, Status::Completed);
    }

    #[test]
    fn zero_progress_keeps_pending() {
        let mut doc = doc_with(vec![make_task("task_a")]);
        Event::progress(&doc.tasks[0], 0, None, Utc::now())
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc.tasks[0].status, Status::Pending);
    }

    #[test]
    fn time_log_is_additive() {
        let mut doc = doc_with(vec![make_task("task_a")]);
        Event::time_log(&doc.tasks[0], 10, None, Utc::now())
            .apply(&mut doc)
            .unwrap();
        let second = Event::time_log(&doc.tasks[0], 15, None, Utc::now());
        assert!(matches!(
            second,
            Event::TimeLog {
                old_total: 10,
                new_total: 25,
                ..
            }
        ));
        second.apply(&mut doc).unwrap();
        assert_eq!(doc.tasks[0].actual_minutes, 25);
        assert_eq!(doc.tasks[0].status, Status::InProgress);
    }

    #[test]
    fn blocked_is_unconditional() {
        let mut doc = doc_with(vec![make_task("task_a")]);
        doc.tasks[0].status = Status::Completed;
        let event = Event::blocked(&doc.tasks[0], "waiting on API key".into(), Utc::now());
        event.apply(&mut doc).unwrap();
        assert_eq!(doc.tasks[0].status, Status::Blocked);
        assert_eq!(doc.tasks[0].blocked_reason.as_deref(), Some("waiting on API key"));
        assert_eq!(event.summary().0, "BLOCKED");
    }

    #[test]
    fn complete_does_not_touch_progress() {
        let mut doc = doc_with(vec![make_task("task_a")]);
        doc.tasks[0].progress = 40;
        let now = Utc::now();
        Event::completed(&doc.tasks[0], Some("done".into()), now)
            .apply(&mut doc)
            .unwrap();
        let task = &doc.tasks[0];
        assert_eq!(task.status, Status::Completed);
        assert_eq!(task.progress, 40);
        assert_eq!(task.completed_at, Some(now));
    }

    #[test]
    fn update_appends_notes_and_skips_known_dependencies() {
        let mut doc = doc_with(vec![make_task("task_a"), make_task("task_b")]);
        doc.tasks[1].notes = "first".into();
        doc.tasks[1].depends_on = vec!["task_a".into()];

        let event = Event::task_updated(
            &doc.tasks[1],
            Some(Status::NeedsInput),
            Some(Priority::High),
            Some("second".into()),
            vec!["task_a".into()],
            Utc::now(),
        );
        if let Event::TaskUpdated {
            added_dependencies,
            ..
        } = &event
        {
            assert!(added_dependencies.is_empty());
        }
        event.apply(&mut doc).unwrap();

        let task = &doc.tasks[1];
        assert_eq!(task.status, Status::NeedsInput);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.notes, "first\nsecond");
        assert_eq!(task.depends_on, vec!["task_a"]);
    }

    #[test]
    fn apply_to_missing_task_fails() {
        let mut doc = doc_with(vec![]);
        let task = make_task("task_ghost");
        let err = Event::progress(&task, 10, None, Utc::now())
            .apply(&mut doc)
            .unwrap_err();
        assert!(matches!(err, ProtaskError::TaskNotFound(_)));
    }

    #[test]
    fn health_check_with_a_missing_task_changes_nothing() {
        let mut doc = doc_with(vec![make_task("task_a")]);
        doc.tasks[0].recurring = true;
        let event = Event::HealthCheck {
            issues_found: 2,
            anomalies_found: 0,
            auto_fixes_applied: 2,
            repairs: vec![
                Repair::ClearRecurring {
                    task_id: "task_a".into(),
                },
                Repair::ClearRecurring {
                    task_id: "task_ghost".into(),
                },
            ],
            timestamp: Utc::now(),
        };
        let err = event.apply(&mut doc).unwrap_err();
        assert!(matches!(err, ProtaskError::TaskNotFound(ref id) if id == "task_ghost"));
        assert!(doc.tasks[0].recurring);
    }

    #[test]
    fn creation_events_are_idempotent() {
        let mut doc = doc_with(vec![]);
        let event = Event::TaskCreated {
            task: make_task("task_a"),
        };
        event.apply(&mut doc).unwrap();
        event.apply(&mut doc).unwrap();
        assert_eq!(doc.tasks.len(), 1);
    }

    #[test]
    fn serializes_with_event_type_and_content() {
        let now = Utc::now() - Duration::minutes(1);
        let event = Event::progress(&make_task("task_a"), 30, None, now);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "PROGRESS_CHANGE");
        assert_eq!(value["content"]["old_progress"], 0);
        assert_eq!(value["content"]["new_progress"], 30);
        let parsed: Event = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn velocity_reports_pace() {
        assert_eq!(velocity(30, Some(60)).as_deref(), Some("50% faster than estimate"));
        assert_eq!(velocity(90, Some(60)).as_deref(), Some("50% slower than estimate"));
        assert_eq!(velocity(60, Some(60)).as_deref(), Some("on pace with estimate"));
        assert_eq!(velocity(60, None), None);
        assert_eq!(velocity(60, Some(0)), None);
    }
}
