//! Dependency resolution over the `depends_on` graph.

use std::collections::{HashMap, HashSet};

use crate::error::{ProtaskError, Result};
use crate::model::{Document, Status, Task};

/// A task is eligible when every dependency exists and is completed.
/// Missing dependency ids make the task ineligible.
pub fn dependencies_met(doc: &Document, task: &Task) -> bool {
    task.depends_on.iter().all(|dep_id| {
        doc.task(dep_id)
            .is_some_and(|dep| dep.status == Status::Completed)
    })
}

/// Dependency ids of `task` that do not resolve to a task in `doc`.
pub fn missing_dependencies<'a>(doc: &Document, task: &'a Task) -> Vec<&'a str> {
    task.depends_on
        .iter()
        .filter(|dep_id| doc.task(dep_id).is_none())
        .map(String::as_str)
        .collect()
}

fn build_adjacency(tasks: &[Task]) -> HashMap<&str, HashSet<&str>> {
    let mut adjacency: HashMap<&str, HashSet<&str>> = HashMap::new();

    for task in tasks {
        adjacency.entry(task.id.as_str()).or_default();
        for dep in &task.depends_on {
            adjacency
                .entry(task.id.as_str())
                .or_default()
                .insert(dep.as_str());
            adjacency.entry(dep.as_str()).or_default();
        }
    }

    adjacency
}

fn has_path<'a>(
    adjacency: &HashMap<&'a str, HashSet<&'a str>>,
    start: &'a str,
    target: &str,
    visited: &mut HashSet<&'a str>,
) -> bool {
    if start == target {
        return true;
    }

    if !visited.insert(start) {
        return false;
    }

    adjacency.get(start).is_some_and(|deps| {
        deps.iter()
            .copied()
            .any(|next| has_path(adjacency, next, target, visited))
    })
}

/// Check that adding `task_id -> dep_ids` edges keeps the graph acyclic, and
/// that every dependency exists.
pub fn validate_new_edges(doc: &Document, task_id: &str, dep_ids: &[String]) -> Result<()> {
    for dep_id in dep_ids {
        if doc.task(dep_id).is_none() {
            return Err(ProtaskError::TaskNotFound(dep_id.clone()));
        }
    }

    let mut adjacency = build_adjacency(&doc.tasks);
    adjacency.entry(task_id).or_default();

    for dep_id in dep_ids {
        if dep_id == task_id {
            return Err(ProtaskError::CycleDetected(task_id.to_string()));
        }

        let already_present = adjacency
            .get(task_id)
            .is_some_and(|existing| existing.contains(dep_id.as_str()));
        if already_present {
            continue;
        }

        let mut visited = HashSet::new();
        if has_path(&adjacency, dep_id.as_str(), task_id, &mut visited) {
            return Err(ProtaskError::CycleDetected(task_id.to_string()));
        }

        adjacency.entry(task_id).or_default().insert(dep_id.as_str());
    }

    Ok(())
}

/// Detect dependency cycles using DFS. Returns the first task id found on a cycle.
pub fn detect_cycle(doc: &Document) -> Option<String> {
    // 0 = unvisited, 1 = in-stack, 2 = done
    let mut visited: HashMap<&str, u8> = HashMap::new();

    for task in &doc.tasks {
        if visited.get(task.id.as_str()).copied().unwrap_or(0) == 0
            && let Some(cycle_id) = dfs(task.id.as_str(), doc, &mut visited)
        {
            return Some(cycle_id.to_string());
        }
    }
    None
}

fn dfs<'a>(id: &'a str, doc: &'a Document, visited: &mut HashMap<&'a str, u8>) -> Option<&'a str> {
    visited.insert(id, 1);
    if let Some(task) = doc.task(id) {
        for dep in &task.depends_on {
            match visited.get(dep.as_str()).copied() {
                Some(1) => return Some(dep.as_str()),
                Some(0) | None => {
                    if doc.task(dep).is_some()
                        && let Some(c) = dfs(dep.as_str(), doc, visited)
                    {
                        return Some(c);
                    }
                }
                _ => {}
            }
        }
    }
    visited.insert(id, 2);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use crate::test_support::{doc_with, task_with};

    #[test]
    fn no_dependencies_is_always_eligible() {
        let doc = doc_with(vec![task_with("task_a", Priority::Low, &[])]);
        assert!(dependencies_met(&doc, &doc.tasks[0]));
    }

    #[test]
    fn incomplete_or_missing_dependency_blocks() {
        let doc = doc_with(vec![
            task_with("task_a", Priority::Low, &[]),
            task_with("task_b", Priority::Low, &["task_a"]),
            task_with("task_c", Priority::Low, &["task_gone"]),
        ]);
        assert!(!dependencies_met(&doc, &doc.tasks[1]));
        assert!(!dependencies_met(&doc, &doc.tasks[2]));
        assert_eq!(missing_dependencies(&doc, &doc.tasks[2]), vec!["task_gone"]);
    }

    #[test]
    fn completed_dependency_unblocks() {
        let mut doc = doc_with(vec![
            task_with("task_a", Priority::Low, &[]),
            task_with("task_b", Priority::Low, &["task_a"]),
        ]);
        doc.tasks[0].status = Status::Completed;
        assert!(dependencies_met(&doc, &doc.tasks[1]));
    }

    #[test]
    fn rejects_edge_that_closes_a_cycle() {
        let doc = doc_with(vec![
            task_with("task_a", Priority::Low, &[]),
            task_with("task_b", Priority::Low, &["task_a"]),
            task_with("task_c", Priority::Low, &["task_b"]),
        ]);
        let err = validate_new_edges(&doc, "task_a", &["task_c".into()]).unwrap_err();
        assert!(matches!(err, ProtaskError::CycleDetected(id) if id == "task_a"));
    }

    #[test]
    fn rejects_self_dependency_and_unknown_ids() {
        let doc = doc_with(vec![task_with("task_a", Priority::Low, &[])]);
        assert!(matches!(
            validate_new_edges(&doc, "task_a", &["task_a".into()]),
            Err(ProtaskError::CycleDetected(_))
        ));
        assert!(matches!(
            validate_new_edges(&doc, "task_a", &["task_zzz".into()]),
            Err(ProtaskError::TaskNotFound(_))
        ));
    }

    #[test]
    fn allows_transitive_redundant_edge() {
        let doc = doc_with(vec![
            task_with("task_a", Priority::Low, &[]),
            task_with("task_b", Priority::Low, &["task_a"]),
            task_with("task_c", Priority::Low, &["task_b"]),
        ]);
        validate_new_edges(&doc, "task_c", &["task_a".into()]).unwrap();
    }

    #[test]
    fn new_task_edges_validate_against_existing_graph() {
        let doc = doc_with(vec![task_with("task_a", Priority::Low, &[])]);
        validate_new_edges(&doc, "task_new", &["task_a".into()]).unwrap();
    }

    #[test]
    fn detects_existing_cycle() {
        let doc = doc_with(vec![
            task_with("task_a", Priority::Low, &["task_c"]),
            task_with("task_b", Priority::Low, &["task_a"]),
            task_with("task_c", Priority::Low, &["task_b"]),
        ]);
        assert!(detect_cycle(&doc).is_some());
    }

    #[test]
    fn dag_has_no_cycle() {
        let doc = doc_with(vec![
            task_with("task_a", Priority::Low, &[]),
            task_with("task_b", Priority::Low, &["task_a"]),
            task_with("task_c", Priority::Low, &["task_a", "task_b"]),
        ]);
        assert!(detect_cycle(&doc).is_none());
    }
}
