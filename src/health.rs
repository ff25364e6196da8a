//! Consistency checks over the whole document.
//!
//! [`check`] is pure: it returns the repairs it would make and the caller
//! applies them through a `HEALTH_CHECK` event, so the fix is logged to the
//! WAL like any other mutation. Anomalies are reported and never repaired.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::deps::{detect_cycle, missing_dependencies};
use crate::events::Repair;
use crate::model::{Document, Status, Task};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Finding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub check: &'static str,
    pub message: String,
}

impl Finding {
    fn task(task: &Task, check: &'static str, message: impl Into<String>) -> Self {
        Self {
            task_id: Some(task.id.clone()),
            check,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct HealthReport {
    /// Invariant violations; each has a matching entry in `repairs`.
    pub issues: Vec<Finding>,
    /// Suspicious but valid states, reported only.
    pub anomalies: Vec<Finding>,
    pub repairs: Vec<Repair>,
}

impl HealthReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.anomalies.is_empty()
    }
}

pub fn check(doc: &Document, now: DateTime<Utc>, anomaly_factor: u32) -> HealthReport {
    let mut report = HealthReport::default();

    for task in &doc.tasks {
        check_task(doc, task, now, anomaly_factor, &mut report);
    }

    if let Some(task_id) = detect_cycle(doc) {
        report.anomalies.push(Finding {
            task_id: Some(task_id.clone()),
            check: "dependency_cycle",
            message: format!("task {task_id} is part of a dependency cycle"),
        });
    }

    report
}

fn check_task(
    doc: &Document,
    task: &Task,
    now: DateTime<Utc>,
    anomaly_factor: u32,
    report: &mut HealthReport,
) {
    if task.recurring && task.goal_id.is_none() {
        report.issues.push(Finding::task(
            task,
            "recurring_without_goal",
            "recurring task has no goal; cleared recurring flag",
        ));
        report.repairs.push(Repair::ClearRecurring {
            task_id: task.id.clone(),
        });
    }

    let completed = task.status == Status::Completed;
    if task.progress > 100 || (completed && task.progress < 100) {
        let message = if task.progress > 100 {
            format!("progress {}% out of range; clamped to 100%", task.progress)
        } else {
            format!("completed task at {}%; set to 100%", task.progress)
        };
        report
            .issues
            .push(Finding::task(task, "progress_mismatch", message));
        report.repairs.push(Repair::SetProgress {
            task_id: task.id.clone(),
            old: task.progress,
            new: 100,
        });
    }

    if completed {
        match task.completed_at {
            None => {
                report.issues.push(Finding::task(
                    task,
                    "missing_completed_at",
                    "completed task has no completion time; stamped now",
                ));
                report.repairs.push(Repair::SetCompletedAt {
                    task_id: task.id.clone(),
                    old: None,
                    new: now,
                });
            }
            Some(at) if at > now => {
                report.issues.push(Finding::task(
                    task,
                    "future_completed_at",
                    format!("completion time {} is in the future; reset to now", at.to_rfc3339()),
                ));
                report.repairs.push(Repair::SetCompletedAt {
                    task_id: task.id.clone(),
                    old: Some(at),
                    new: now,
                });
            }
            Some(_) => {}
        }
    }

    let estimate = task.estimate_minutes.unwrap_or(1);
    if u64::from(task.actual_minutes) > u64::from(anomaly_factor) * u64::from(estimate) {
        report.anomalies.push(Finding::task(
            task,
            "time_overrun",
            format!(
                "{} min logged against an estimate of {estimate} min",
                task.actual_minutes
            ),
        ));
    }

    if let Some(goal_id) = &task.goal_id
        && doc.goal(goal_id).is_none()
    {
        report.anomalies.push(Finding::task(
            task,
            "dangling_goal",
            format!("goal {goal_id} does not exist"),
        ));
    }

    for dep in missing_dependencies(doc, task) {
        report.anomalies.push(Finding::task(
            task,
            "dangling_dependency",
            format!("dependency {dep} does not exist"),
        ));
    }
}
