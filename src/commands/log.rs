use std::path::Path;

use serde_json::json;

use crate::commands::require_task;
use crate::error::Result;
use crate::output::{self, Format};
use crate::store::repo::Repo;
use crate::store::wal::WalEntry;

/// WAL entries that touch `id`, oldest first. Health-check entries are
/// included when one of their repairs targeted the task.
pub fn history(repo: &Repo, id: &str) -> Result<Vec<WalEntry>> {
    require_task(&repo.doc, id)?;
    let entries = repo
        .wal_entries()?
        .into_iter()
        .filter(|entry| entry.event().is_some_and(|event| event.mentions_task(id)))
        .collect();
    Ok(entries)
}

pub fn run(root: &Path, id: &str, format: Format) -> Result<()> {
    let repo = Repo::open(root)?;
    let entries = history(&repo, id)?;
    match format {
        Format::Json => output::print_success(json!({ "task_id": id, "history": entries }))?,
        Format::Pretty => {
            for entry in &entries {
                let summary = entry
                    .event()
                    .map(|event| event.summary().1)
                    .unwrap_or_default();
                println!(
                    "{}  {:16} {summary}",
                    entry.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                    entry.event_type
                );
            }
        }
    }
    Ok(())
}
