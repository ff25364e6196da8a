use std::path::Path;

use chrono::Utc;
use serde_json::json;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store::repo::Repo;

pub fn run(root: &Path, format: Format) -> Result<()> {
    let repo = Repo::open(root)?;
    let outcome = repo.flush_buffer(Utc::now())?;
    let message = match outcome.archive {
        Some(ref archive) => format!("Buffer flushed to {}", archive.display()),
        None => "Buffer is empty, nothing to flush".to_string(),
    };
    match format {
        Format::Json => output::print_success(json!({
            "message": message,
            "lines_flushed": outcome.lines_flushed,
        }))?,
        Format::Pretty => output::print_message(&message),
    }
    Ok(())
}
