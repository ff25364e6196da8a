use std::path::Path;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde_json::json;

use crate::error::Result;
use crate::events::Event;
use crate::health::{self, HealthReport};
use crate::output::{self, Format};
use crate::store::repo::Repo;

/// Run every check, apply the repairs through a `HEALTH_CHECK` event, and
/// return the report. The event is logged even when nothing was wrong.
pub fn check_and_repair(repo: &mut Repo, now: DateTime<Utc>) -> Result<HealthReport> {
    let report = health::check(&repo.doc, now, repo.config.time_anomaly_factor);
    for issue in &report.issues {
        tracing::info!(task = ?issue.task_id, check = issue.check, "{}", issue.message);
    }

    let event = Event::HealthCheck {
        issues_found: report.issues.len(),
        anomalies_found: report.anomalies.len(),
        auto_fixes_applied: report.repairs.len(),
        repairs: report.repairs.clone(),
        timestamp: now,
    };
    repo.commit(event, now)?;
    Ok(report)
}

pub fn run(root: &Path, format: Format) -> Result<()> {
    let mut repo = Repo::open(root)?;
    let report = check_and_repair(&mut repo, Utc::now())?;
    let summary = format!(
        "Found {} issues, auto-fixed {}",
        report.issues.len(),
        report.repairs.len()
    );

    match format {
        Format::Json => output::print_success(json!({
            "health_status": if report.issues.is_empty() { "healthy" } else { "issues_found" },
            "issues": report.issues,
            "anomalies": report.anomalies,
            "auto_fixes": report.repairs,
            "summary": summary,
        }))?,
        Format::Pretty => {
            for issue in &report.issues {
                let task = issue.task_id.as_deref().unwrap_or("-");
                println!("{}  {task}: {}", "fixed".green(), issue.message);
            }
            for anomaly in &report.anomalies {
                let task = anomaly.task_id.as_deref().unwrap_or("-");
                println!("{}  {task}: {}", " warn".yellow(), anomaly.message);
            }
            if report.is_clean() {
                println!("{}", "healthy".green().bold());
            }
            println!("{summary}");
        }
    }
    Ok(())
}
