use std::fs;
use std::path::Path;

use chrono::{Duration, Utc};
use protask::commands::create::{self, NewTask};
use protask::commands::{edit, health, lifecycle, log};
use protask::events::Event;
use protask::model::{GoalStatus, Priority, Status};
use protask::schedule::{NextFilter, next_task};
use protask::store::files::StoreFile;
use protask::store::repo::Repo;
use protask::store::wal::Wal;
use tempfile::tempdir;

fn seed_goal(root: &Path, title: &str) -> String {
    let mut repo = Repo::open(root).unwrap();
    create::add_goal(
        &mut repo,
        title.into(),
        Priority::Medium,
        None,
        GoalStatus::Active,
        Utc::now(),
    )
    .unwrap()
    .id
}

fn seed_task(root: &Path, goal: &str, title: &str, priority: Priority, deps: &[&str]) -> String {
    let mut repo = Repo::open(root).unwrap();
    create::add_task(
        &mut repo,
        NewTask {
            goal: goal.into(),
            title: title.into(),
            priority: Some(priority),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            ..NewTask::default()
        },
        Utc::now(),
    )
    .unwrap()
    .id
}

#[test]
fn mark_progress_updates_task_and_logs_old_and_new() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let task = seed_task(dir.path(), &goal, "Write copy", Priority::Medium, &[]);

    let mut repo = Repo::open(dir.path()).unwrap();
    let updated = lifecycle::mark_progress(&mut repo, &task, 60, None, Utc::now()).unwrap();
    assert_eq!(updated.progress, 60);
    assert_eq!(updated.status, Status::InProgress);

    let entry = repo
        .wal_entries()
        .unwrap()
        .into_iter()
        .find(|e| e.event_type == "PROGRESS_CHANGE")
        .unwrap();
    assert_eq!(entry.content["task_id"], task.as_str());
    assert_eq!(entry.content["old_progress"], 0);
    assert_eq!(entry.content["new_progress"], 60);
}

#[test]
fn log_time_accumulates() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let task = seed_task(dir.path(), &goal, "Write copy", Priority::Medium, &[]);

    let mut repo = Repo::open(dir.path()).unwrap();
    lifecycle::log_time(&mut repo, &task, 10, None, Utc::now()).unwrap();
    let updated = lifecycle::log_time(&mut repo, &task, 15, Some("review".into()), Utc::now()).unwrap();
    assert_eq!(updated.actual_minutes, 25);
    assert_eq!(updated.notes, "review");
}

#[test]
fn completed_progress_is_left_for_health_check() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let task = seed_task(dir.path(), &goal, "Write copy", Priority::Medium, &[]);

    let mut repo = Repo::open(dir.path()).unwrap();
    lifecycle::mark_progress(&mut repo, &task, 40, None, Utc::now()).unwrap();
    let done = lifecycle::complete(&mut repo, &task, Some("shipped".into()), Utc::now()).unwrap();
    assert_eq!(done.status, Status::Completed);
    assert_eq!(done.progress, 40);
    assert!(done.completed_at.is_some());

    let report = health::check_and_repair(&mut repo, Utc::now()).unwrap();
    assert_eq!(report.issues.len(), 1);
    assert_eq!(repo.doc.task(&task).unwrap().progress, 100);
    drop(repo);

    let mut repo = Repo::open(dir.path()).unwrap();
    assert_eq!(repo.doc.task(&task).unwrap().progress, 100);
    let second = health::check_and_repair(&mut repo, Utc::now()).unwrap();
    assert!(second.issues.is_empty());
}

#[test]
fn health_check_logs_even_without_fixes() {
    let dir = tempdir().unwrap();
    seed_goal(dir.path(), "Launch");

    let mut repo = Repo::open(dir.path()).unwrap();
    let before = fs::read_to_string(repo.layout().store_path()).unwrap();
    health::check_and_repair(&mut repo, Utc::now()).unwrap();

    let entries = repo.wal_entries().unwrap();
    assert_eq!(entries.last().unwrap().event_type, "HEALTH_CHECK");
    assert_eq!(entries.last().unwrap().content["auto_fixes_applied"], 0);
    let after = fs::read_to_string(repo.layout().store_path()).unwrap();
    assert_eq!(before, after, "store is not rewritten when nothing was fixed");
}

#[test]
fn scheduler_waits_for_dependencies() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let first = seed_task(dir.path(), &goal, "Design", Priority::Low, &[]);
    let second = seed_task(dir.path(), &goal, "Build", Priority::High, &[&first]);

    let mut repo = Repo::open(dir.path()).unwrap();
    let (next, next_goal) = next_task(&repo.doc, &NextFilter::default()).unwrap();
    assert_eq!(next.id, first);
    assert_eq!(next_goal.unwrap().id, goal);

    lifecycle::complete(&mut repo, &first, None, Utc::now()).unwrap();
    let (next, _) = next_task(&repo.doc, &NextFilter::default()).unwrap();
    assert_eq!(next.id, second);
}

#[test]
fn task_inherits_goal_priority_and_rejects_unknown_goal() {
    let dir = tempdir().unwrap();
    let mut repo = Repo::open(dir.path()).unwrap();
    create::add_goal(
        &mut repo,
        "Urgent launch".into(),
        Priority::High,
        Some("press date is fixed".into()),
        GoalStatus::Active,
        Utc::now(),
    )
    .unwrap();

    let task = create::add_task(
        &mut repo,
        NewTask {
            goal: "urgent".into(),
            title: "Book venue".into(),
            ..NewTask::default()
        },
        Utc::now(),
    )
    .unwrap();
    assert_eq!(task.priority, Priority::High);

    let err = create::add_task(
        &mut repo,
        NewTask {
            goal: "nonexistent".into(),
            title: "Orphan".into(),
            ..NewTask::default()
        },
        Utc::now(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "goal_not_found");
}

#[test]
fn cycle_is_rejected_and_store_unchanged() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let a = seed_task(dir.path(), &goal, "A", Priority::Medium, &[]);
    let b = seed_task(dir.path(), &goal, "B", Priority::Medium, &[&a]);

    let mut repo = Repo::open(dir.path()).unwrap();
    let before = fs::read_to_string(repo.layout().store_path()).unwrap();
    let wal_before = repo.wal_entries().unwrap().len();

    let err = edit::update_task(&mut repo, &a, None, None, None, vec![b.clone()], Utc::now())
        .unwrap_err();
    assert_eq!(err.code(), "cycle_detected");
    assert_eq!(fs::read_to_string(repo.layout().store_path()).unwrap(), before);
    assert_eq!(repo.wal_entries().unwrap().len(), wal_before);
}

#[test]
fn update_appends_notes_and_adds_dependencies() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let a = seed_task(dir.path(), &goal, "A", Priority::Medium, &[]);
    let b = seed_task(dir.path(), &goal, "B", Priority::Medium, &[]);

    let mut repo = Repo::open(dir.path()).unwrap();
    edit::update_task(&mut repo, &b, None, None, Some("first".into()), vec![], Utc::now()).unwrap();
    let updated = edit::update_task(
        &mut repo,
        &b,
        Some(Status::NeedsInput),
        Some(Priority::Low),
        Some("second".into()),
        vec![a.clone()],
        Utc::now(),
    )
    .unwrap();
    assert_eq!(updated.notes, "first\nsecond");
    assert_eq!(updated.depends_on, vec![a]);
    assert_eq!(updated.status, Status::NeedsInput);
    assert!(updated.completed_at.is_none());
}

#[test]
fn update_goal_changes_status() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");

    let mut repo = Repo::open(dir.path()).unwrap();
    let updated = edit::update_goal(
        &mut repo,
        &goal,
        Some(GoalStatus::Paused),
        None,
        Some("waiting for budget".into()),
        Utc::now(),
    )
    .unwrap();
    assert_eq!(updated.status, GoalStatus::Paused);
    assert_eq!(updated.context.as_deref(), Some("waiting for budget"));
    assert_eq!(repo.wal_entries().unwrap().last().unwrap().event_type, "GOAL_UPDATED");
}

#[test]
fn unapplied_wal_entry_is_replayed_once() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let task = seed_task(dir.path(), &goal, "Write copy", Priority::Medium, &[]);

    // Simulate a crash between the WAL append and the store save.
    let (layout, wal_seq, event) = {
        let repo = Repo::open(dir.path()).unwrap();
        let event = Event::time_log(repo.doc.task(&task).unwrap(), 30, None, Utc::now());
        (repo.layout().clone(), repo.doc.wal_seq, event)
    };
    Wal::new(layout.clone())
        .append(wal_seq + 1, &event, Utc::now())
        .unwrap();
    let stored = StoreFile::new(layout.store_path()).load().unwrap();
    assert_eq!(stored.task(&task).unwrap().actual_minutes, 0);

    let repo = Repo::open(dir.path()).unwrap();
    assert_eq!(repo.doc.task(&task).unwrap().actual_minutes, 30);
    assert_eq!(repo.doc.wal_seq, wal_seq + 1);
    drop(repo);

    let stored = StoreFile::new(layout.store_path()).load().unwrap();
    assert_eq!(stored.task(&task).unwrap().actual_minutes, 30);
    assert_eq!(stored.wal_seq, wal_seq + 1);

    let repo = Repo::open(dir.path()).unwrap();
    assert_eq!(repo.doc.task(&task).unwrap().actual_minutes, 30);
}

#[test]
fn replay_disabled_leaves_store_alone() {
    let dir = tempdir().unwrap();
    Repo::init(dir.path()).unwrap();
    let config_path = dir.path().join(".protask").join("config.json");
    fs::write(&config_path, r#"{"replay_wal": false}"#).unwrap();

    let goal = seed_goal(dir.path(), "Launch");
    let task = seed_task(dir.path(), &goal, "Write copy", Priority::Medium, &[]);
    let (layout, wal_seq, event) = {
        let repo = Repo::open(dir.path()).unwrap();
        let event = Event::time_log(repo.doc.task(&task).unwrap(), 30, None, Utc::now());
        (repo.layout().clone(), repo.doc.wal_seq, event)
    };
    Wal::new(layout).append(wal_seq + 1, &event, Utc::now()).unwrap();

    let repo = Repo::open(dir.path()).unwrap();
    assert_eq!(repo.doc.task(&task).unwrap().actual_minutes, 0);
}

#[test]
fn task_history_includes_health_repairs() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let task = seed_task(dir.path(), &goal, "Write copy", Priority::Medium, &[]);
    let other = seed_task(dir.path(), &goal, "Other", Priority::Medium, &[]);

    let mut repo = Repo::open(dir.path()).unwrap();
    lifecycle::mark_progress(&mut repo, &other, 10, None, Utc::now()).unwrap();
    lifecycle::complete(&mut repo, &task, None, Utc::now() - Duration::minutes(1)).unwrap();
    health::check_and_repair(&mut repo, Utc::now()).unwrap();

    let kinds: Vec<String> = log::history(&repo, &task)
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(kinds, vec!["TASK_CREATED", "TASK_COMPLETED", "HEALTH_CHECK"]);

    let err = log::history(&repo, "task_missing").unwrap_err();
    assert_eq!(err.code(), "task_not_found");
}

#[test]
fn session_state_and_buffer_follow_task_changes() {
    let dir = tempdir().unwrap();
    let goal = seed_goal(dir.path(), "Launch");
    let task = seed_task(dir.path(), &goal, "Write copy", Priority::Medium, &[]);

    let mut repo = Repo::open(dir.path()).unwrap();
    lifecycle::mark_blocked(&mut repo, &task, "waiting on legal".into(), Utc::now()).unwrap();

    let session = fs::read_to_string(repo.layout().session_state_path()).unwrap();
    assert!(session.contains("- Status: blocked"));
    assert!(session.contains("## Next Action\nBLOCKED: waiting on legal"));

    let buffer = fs::read_to_string(repo.layout().buffer_path()).unwrap();
    assert!(buffer.lines().any(|l| l.starts_with("- BLOCKED (") && l.ends_with("waiting on legal")));

    let outcome = repo.flush_buffer(Utc::now()).unwrap();
    assert_eq!(outcome.lines_flushed, buffer.lines().count());
    assert_eq!(fs::read_to_string(repo.layout().buffer_path()).unwrap(), "");
}
