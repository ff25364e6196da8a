//! Append-only per-day write-ahead log under `memory/`.
//!
//! One JSON object per line: `{seq, timestamp, event_type, content}`.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::Layout;
use crate::error::Result;
use crate::events::Event;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalEntry {
    /// Zero for entries written without a sequence number; those are never replayed.
    #[serde(default)]
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    #[serde(default)]
    pub content: Value,
}

impl WalEntry {
    fn new(seq: u64, event: &Event, timestamp: DateTime<Utc>) -> Result<Self> {
        let mut value = serde_json::to_value(event)?;
        let content = value
            .get_mut("content")
            .map(Value::take)
            .unwrap_or(Value::Null);
        Ok(Self {
            seq,
            timestamp,
            event_type: event.event_type().to_string(),
            content,
        })
    }

    /// Decode the typed event. `None` for event types this build does not know.
    pub fn event(&self) -> Option<Event> {
        let tagged = json!({"event_type": self.event_type, "content": self.content});
        match serde_json::from_value(tagged) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(seq = self.seq, event_type = %self.event_type, error = %err, "undecodable WAL entry");
                None
            }
        }
    }
}

pub struct Wal {
    layout: Layout,
}

impl Wal {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Append `event` to today's log file and return the written entry.
    pub fn append(&self, seq: u64, event: &Event, now: DateTime<Utc>) -> Result<WalEntry> {
        fs::create_dir_all(self.layout.memory_dir())?;
        let entry = WalEntry::new(seq, event, now)?;
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let path = self.layout.wal_path(now.date_naive());
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        // a torn tail from a crashed append must not swallow this entry
        if !ends_with_newline(&mut file)? {
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        tracing::debug!(seq, event_type = %entry.event_type, path = %path.display(), "wal append");
        Ok(entry)
    }

    fn log_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.layout.memory_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_wal = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("WAL-") && n.ends_with(".log"));
            if is_wal {
                files.push(path);
            }
        }
        // WAL-YYYY-MM-DD sorts chronologically by name
        files.sort();
        Ok(files)
    }

    /// Every readable entry, oldest file first, in file order.
    /// Lines that fail to parse (e.g. a write torn by a crash) are skipped.
    pub fn read_all(&self) -> Result<Vec<WalEntry>> {
        let mut entries = Vec::new();
        for path in self.log_files()? {
            entries.extend(read_file(&path)?);
        }
        Ok(entries)
    }

    /// Entries from the newest files back to the first file holding an
    /// entry the store has already applied (`0 < seq <= wal_seq`).
    ///
    /// Sequence numbers grow with the file date, so older files cannot
    /// hold anything pending and are not read.
    pub fn read_tail(&self, wal_seq: u64) -> Result<Vec<WalEntry>> {
        let mut files = Vec::new();
        for path in self.log_files()?.into_iter().rev() {
            let entries = read_file(&path)?;
            let covered = entries.iter().any(|e| e.seq > 0 && e.seq <= wal_seq);
            files.push(entries);
            if covered {
                break;
            }
        }
        Ok(files.into_iter().rev().flatten().collect())
    }
}

fn ends_with_newline(file: &mut fs::File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn read_file(path: &Path) -> Result<Vec<WalEntry>> {
    let data = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (lineno, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<WalEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => tracing::warn!(
                path = %path.display(),
                line = lineno + 1,
                error = %err,
                "skipping malformed WAL line"
            ),
        }
    }
    Ok(entries)
}

/// Next sequence number given the existing entries and the store's high-water mark.
pub fn next_seq(entries: &[WalEntry], wal_seq: u64) -> u64 {
    entries
        .iter()
        .map(|e| e.seq)
        .max()
        .unwrap_or(0)
        .max(wal_seq)
        + 1
}

/// Sequenced entries the store has not seen yet, in sequence order.
pub fn pending_after(entries: Vec<WalEntry>, wal_seq: u64) -> Vec<WalEntry> {
    let mut pending: Vec<WalEntry> = entries
        .into_iter()
        .filter(|e| e.seq > 0 && e.seq > wal_seq)
        .collect();
    pending.sort_by_key(|e| e.seq);
    pending
}
