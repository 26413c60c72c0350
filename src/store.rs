//! Shared session snapshot store.
//!
//! Every ccmon process (hook invocations, the dashboard, the CLI) reads
//! and writes one JSON snapshot file holding all tracked sessions. Writes
//! are debounced so a burst of hook events collapses into one disk write;
//! reads garbage-collect records whose terminal died or whose last event
//! is too old. Processes coordinate through the file alone, last writer
//! wins.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::config;
use crate::session::{determine_status, HookEvent, Session};
use crate::tty::TtyChecker;

/// Delay between a mutation and the disk write it schedules. Another
/// mutation inside the window supersedes the pending write.
const WRITE_DEBOUNCE: Duration = Duration::from_millis(50);

/// Sessions with no event for this long are dropped on the next read.
const SESSION_TIMEOUT_SECS: i64 = 2 * 60 * 60;

/// The persisted unit: every tracked session plus a write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    pub sessions: HashMap<String, Session>,
    pub updated_at: DateTime<Utc>,
}

impl StoreData {
    fn empty() -> Self {
        Self {
            sessions: HashMap::new(),
            updated_at: Utc::now(),
        }
    }
}

struct StoreInner {
    /// Authoritative snapshot once any write happened in this process
    cached: Option<StoreData>,
    /// Id of the pending debounced flush; bumping it cancels the flush
    flush_gen: u64,
}

/// Handle on the snapshot file. Owns the in-memory cache, the debounce
/// state, and the terminal liveness oracle used during read passes.
pub struct SessionStore {
    path: PathBuf,
    inner: Arc<Mutex<StoreInner>>,
    tty: TtyChecker,
}

impl SessionStore {
    /// Opens the store at the default location (`~/.ccmon/sessions.json`,
    /// honoring the `CCMON_DIR` override).
    pub fn open() -> Self {
        Self::with_path(config::store_path())
    }

    /// Opens a store backed by an explicit file.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            inner: Arc::new(Mutex::new(StoreInner {
                cached: None,
                flush_gen: 0,
            })),
            tty: TtyChecker::new(),
        }
    }

    /// Applies one validated hook event and returns the resulting record.
    ///
    /// Creates the session on first sight (both timestamps set to now);
    /// afterwards `created_at` never changes and `updated_at` tracks the
    /// latest event. A terminal identifier, once recorded, sticks until an
    /// event reports a new one.
    pub fn update_session(&self, event: &HookEvent) -> Session {
        let mut inner = self.lock();
        let mut data = self.load_snapshot(&inner);

        if let Some(tty) = &event.tty {
            remove_sessions_on_tty(&mut data.sessions, &event.session_id, tty);
        }

        let previous = data.sessions.get(&event.session_id);
        let status = determine_status(event, previous.map(|s| s.status));
        let session = match previous {
            Some(prev) => Session {
                session_id: event.session_id.clone(),
                cwd: event.cwd.clone(),
                tty: event.tty.clone().or_else(|| prev.tty.clone()),
                status,
                created_at: prev.created_at,
                updated_at: Utc::now(),
            },
            None => Session::new(
                event.session_id.clone(),
                event.cwd.clone(),
                event.tty.clone(),
                status,
            ),
        };

        data.sessions.insert(event.session_id.clone(), session.clone());
        self.store_snapshot(&mut inner, data);
        session
    }

    /// Returns live sessions sorted by creation time.
    ///
    /// Records whose terminal died or whose last event is older than the
    /// session timeout are evicted; if anything was evicted, the pruned
    /// snapshot is scheduled for persistence.
    pub fn sessions(&self) -> Vec<Session> {
        let mut inner = self.lock();
        let mut data = self.load_snapshot(&inner);

        let now = Utc::now();
        let before = data.sessions.len();
        data.sessions.retain(|_, session| {
            now.signed_duration_since(session.updated_at).num_seconds() <= SESSION_TIMEOUT_SECS
                && self.tty.is_alive(session.tty.as_deref())
        });

        let mut sessions: Vec<Session> = data.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        if data.sessions.len() != before {
            self.store_snapshot(&mut inner, data);
        }
        sessions
    }

    /// Looks up a single session. No eviction pass.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let inner = self.lock();
        self.load_snapshot(&inner).sessions.get(session_id).cloned()
    }

    /// Removes a single session record if present.
    pub fn remove(&self, session_id: &str) {
        let mut inner = self.lock();
        let mut data = self.load_snapshot(&inner);
        if data.sessions.remove(session_id).is_some() {
            self.store_snapshot(&mut inner, data);
        }
    }

    /// Replaces the snapshot with an empty one.
    pub fn clear(&self) {
        let mut inner = self.lock();
        self.store_snapshot(&mut inner, StoreData::empty());
    }

    /// Cancels any pending debounced write and persists synchronously.
    /// Short-lived processes call this before exiting.
    pub fn flush(&self) {
        let mut inner = self.lock();
        inner.flush_gen += 1;
        persist(&mut inner, &self.path);
    }

    /// Drops the in-memory snapshot without writing. For test isolation.
    pub fn reset_cache(&self) {
        let mut inner = self.lock();
        inner.cached = None;
        inner.flush_gen += 1;
    }

    /// Path of the backing file, for watch setup by dashboards.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current snapshot: the in-process cache when present, disk otherwise.
    fn load_snapshot(&self, inner: &StoreInner) -> StoreData {
        if let Some(data) = &inner.cached {
            return data.clone();
        }
        read_snapshot(&self.path)
    }

    /// Installs `data` as the cached snapshot and schedules a debounced
    /// flush. The timer thread only writes if no later mutation bumped the
    /// generation while it slept.
    fn store_snapshot(&self, inner: &mut StoreInner, data: StoreData) {
        inner.cached = Some(data);
        inner.flush_gen += 1;
        let flush_gen = inner.flush_gen;

        let inner_ref = Arc::clone(&self.inner);
        let path = self.path.clone();
        thread::spawn(move || {
            thread::sleep(WRITE_DEBOUNCE);
            let mut inner = inner_ref.lock().unwrap_or_else(|e| e.into_inner());
            if inner.flush_gen == flush_gen {
                persist(&mut inner, &path);
            }
        });
    }
}

/// Drops records from other sessions that claim the same terminal. A new
/// session in a terminal means the previous one there is gone, even if it
/// never delivered a Stop event.
fn remove_sessions_on_tty(
    sessions: &mut HashMap<String, Session>,
    session_id: &str,
    tty: &str,
) {
    sessions.retain(|_, s| s.session_id == session_id || s.tty.as_deref() != Some(tty));
}

/// Serializes the cached snapshot to disk, then drops the cache so the
/// next read reconciles with whatever other processes wrote since.
/// Write failures are swallowed; the next mutation rewrites the file.
fn persist(inner: &mut StoreInner, path: &Path) {
    let Some(mut data) = inner.cached.take() else {
        return;
    };
    data.updated_at = Utc::now();
    let _ = write_snapshot(path, &data);
}

/// Reads the snapshot from disk. Missing or unreadable files and corrupt
/// JSON all read as an empty store.
fn read_snapshot(path: &Path) -> StoreData {
    let Ok(contents) = fs::read_to_string(path) else {
        return StoreData::empty();
    };
    match serde_json::from_str(&contents) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Warning: Failed to parse store file {:?}: {}", path, e);
            StoreData::empty()
        }
    }
}

/// Writes the snapshot atomically (temp file + rename) with owner-only
/// permissions, creating the store directory on first use.
fn write_snapshot(path: &Path, data: &StoreData) -> Result<()> {
    if let Some(parent) = path.parent() {
        config::ensure_private_dir(parent)?;
    }

    let json = serde_json::to_string_pretty(data).context("Failed to serialize store")?;
    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, &json)
        .with_context(|| format!("Failed to write temp file: {:?}", temp_path))?;
    config::restrict_file(&temp_path)?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to {:?}", path))?;

    Ok(())
}
