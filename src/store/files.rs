use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ProtaskError, Result};
use crate::model::Document;

/// The single JSON document holding every goal and task.
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted document. A missing file is an empty document;
    /// unparseable content is an error and is left untouched on disk.
    pub fn load(&self) -> Result<Document> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "store missing, starting empty");
            return Ok(Document::default());
        }
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|source| ProtaskError::MalformedStore {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the persisted document: write a sibling temp file, then rename over.
    pub fn save(&self, doc: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(doc)?;
        json.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            goals = doc.goals.len(),
            tasks = doc.tasks.len(),
            wal_seq = doc.wal_seq,
            "store saved"
        );
        Ok(())
    }
}
