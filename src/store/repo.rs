use std::fs::{self, File};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::config::{Config, Layout};
use crate::error::{ProtaskError, Result};
use crate::events::Event;
use crate::model::Document;
use crate::store::files::StoreFile;
use crate::store::lock;
use crate::store::sinks::{FlushOutcome, Sinks, session_action};
use crate::store::wal::{self, Wal, WalEntry};

/// An open workspace: the loaded document plus the files around it.
///
/// Holds the exclusive store lock for its whole lifetime, so one `Repo`
/// is one read-modify-write cycle.
pub struct Repo {
    pub config: Config,
    pub doc: Document,
    layout: Layout,
    store: StoreFile,
    wal: Wal,
    sinks: Sinks,
    next_seq: u64,
    _lock: File,
}

impl Repo {
    /// Create `.protask/`, `memory/` and a default `config.json`.
    pub fn init(root: &Path) -> Result<Layout> {
        let layout = Layout::new(root);
        if layout.config_path().exists() {
            return Err(ProtaskError::AlreadyInitialized);
        }
        fs::create_dir_all(layout.memory_dir())?;
        Config::default().save(&layout.config_path())?;
        tracing::info!(root = %root.display(), "workspace initialized");
        Ok(layout)
    }

    /// Lock and load the workspace at `root`, replaying WAL entries the
    /// store has not seen yet. The data directory is created on demand.
    pub fn open(root: &Path) -> Result<Self> {
        let layout = Layout::new(root);
        fs::create_dir_all(layout.data_dir())?;
        let lock = lock::acquire_lock(&layout.lock_path())?;

        let config = Config::load(&layout.config_path())?;
        let store = StoreFile::new(layout.store_path());
        let mut doc = store.load()?;

        let wal = Wal::new(layout.clone());
        let entries = wal.read_tail(doc.wal_seq)?;
        let next_seq = wal::next_seq(&entries, doc.wal_seq);

        if config.replay_wal {
            let pending = wal::pending_after(entries, doc.wal_seq);
            if replay(&mut doc, &pending) {
                store.save(&doc)?;
            }
        }

        Ok(Self {
            config,
            doc,
            sinks: Sinks::new(layout.clone()),
            layout,
            store,
            wal,
            next_seq,
            _lock: lock,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Log `event` to the WAL, apply it, persist the store, then notify sinks.
    pub fn commit(&mut self, event: Event, now: DateTime<Utc>) -> Result<()> {
        let seq = self.next_seq;
        self.wal.append(seq, &event, now)?;
        self.next_seq += 1;

        event.apply(&mut self.doc)?;
        self.doc.wal_seq = seq;
        if !event.is_noop() {
            self.store.save(&self.doc)?;
        }

        self.notify(&event, now);
        Ok(())
    }

    /// Sink failures are logged, never fatal: the change is already durable.
    fn notify(&self, event: &Event, now: DateTime<Utc>) {
        if self.config.working_buffer {
            let (label, details) = event.summary();
            if let Err(err) = self.sinks.append_buffer(label, &details, now) {
                tracing::warn!(error = %err, "failed to append working buffer");
            }
        }

        if self.config.session_state
            && let Some(task) = event.task_id().and_then(|id| self.doc.task(id))
        {
            let goal = self.doc.goal_of(task);
            if let Err(err) =
                self.sinks
                    .write_session_state(task, goal, &session_action(event), now)
            {
                tracing::warn!(error = %err, "failed to write session state");
            }
        }
    }

    pub fn flush_buffer(&self, now: DateTime<Utc>) -> Result<FlushOutcome> {
        self.sinks.flush(now)
    }

    pub fn wal_entries(&self) -> Result<Vec<WalEntry>> {
        self.wal.read_all()
    }
}

/// Re-apply `pending` in order. Returns whether the document changed.
fn replay(doc: &mut Document, pending: &[WalEntry]) -> bool {
    let mut changed = false;
    for entry in pending {
        if let Some(event) = entry.event() {
            match event.apply(doc) {
                Ok(()) => changed |= !event.is_noop(),
                Err(err) => tracing::warn!(
                    seq = entry.seq,
                    event_type = %entry.event_type,
                    error = %err,
                    "WAL entry could not be replayed"
                ),
            }
        }
        doc.wal_seq = entry.seq;
    }
    if !pending.is_empty() {
        tracing::info!(entries = pending.len(), wal_seq = doc.wal_seq, "replayed WAL");
    }
    changed
}
