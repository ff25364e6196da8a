//! Fixtures shared by unit tests.

use chrono::Utc;

use crate::model::{Document, Goal, GoalStatus, Priority, Status, Task};

pub fn make_goal(id: &str, title: &str) -> Goal {
    Goal {
        id: id.into(),
        title: title.into(),
        priority: Priority::Medium,
        context: None,
        status: GoalStatus::Active,
        created_at: Utc::now(),
    }
}

pub fn make_task(id: &str) -> Task {
    let now = Utc::now();
    Task {
        id: id.into(),
        goal_id: Some("goal_1".into()),
        title: format!("Task {id}"),
        priority: Priority::Medium,
        status: Status::Pending,
        created_at: now,
        updated_at: now,
        completed_at: None,
        notes: String::new(),
        depends_on: vec![],
        estimate_minutes: None,
        actual_minutes: 0,
        progress: 0,
        blocked_reason: None,
        recurring: false,
    }
}

pub fn task_with(id: &str, priority: Priority, deps: &[&str]) -> Task {
    let mut task = make_task(id);
    task.priority = priority;
    task.depends_on = deps.iter().map(|d| d.to_string()).collect();
    task
}

/// A document with one goal (`goal_1`) owning the given tasks.
pub fn doc_with(tasks: Vec<Task>) -> Document {
    Document {
        goals: vec![make_goal("goal_1", "Ship the tracker")],
        tasks,
        wal_seq: 0,
    }
}
