use std::cmp::Reverse;

use crate::deps::dependencies_met;
use crate::model::{Document, Goal, Status, Task};

/// Optional narrowing applied on top of the eligibility rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextFilter {
    pub goal_id: Option<String>,
    /// Only tasks with an estimate at or below this many minutes.
    pub max_estimate: Option<u32>,
}

/// Pending tasks whose dependencies are met, narrowed by `filter`, in
/// scheduling order: priority descending, insertion order within a priority.
pub fn candidates<'a>(doc: &'a Document, filter: &NextFilter) -> Vec<&'a Task> {
    let mut candidates: Vec<&Task> = doc
        .tasks
        .iter()
        .filter(|t| t.status == Status::Pending && dependencies_met(doc, t))
        .filter(|t| {
            filter
                .goal_id
                .as_deref()
                .is_none_or(|goal_id| t.goal_id.as_deref() == Some(goal_id))
        })
        .filter(|t| {
            filter
                .max_estimate
                .is_none_or(|max| t.estimate_minutes.is_some_and(|est| est <= max))
        })
        .collect();

    // sort_by_key is stable, so equal priorities keep store order
    candidates.sort_by_key(|t| Reverse(t.priority.rank()));
    candidates
}

/// The next task to work on, paired with its goal when the reference resolves.
pub fn next_task<'a>(doc: &'a Document, filter: &NextFilter) -> Option<(&'a Task, Option<&'a Goal>)> {
    candidates(doc, filter)
        .into_iter()
        .next()
        .map(|task| (task, doc.goal_of(task)))
}
