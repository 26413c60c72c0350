//! Terminal liveness checks backing session eviction.
//!
//! Session records carry a terminal identifier captured at ingest time.
//! When the terminal behind a record is gone, the record is garbage and
//! the store drops it on the next read. The checks here answer "is this
//! terminal still alive?" cheaply enough to run on every read pass.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a probe result stays valid before the terminal is re-checked.
const CACHE_TTL: Duration = Duration::from_secs(5);

/// Upper bound on cached results; oldest checks are dropped past this.
const MAX_CACHE_ENTRIES: usize = 100;

struct CacheEntry {
    alive: bool,
    checked_at: Instant,
}

/// Liveness oracle with a short-lived result cache.
///
/// Identifiers the oracle cannot interpret, and probes it cannot complete,
/// count as alive. Eviction must never tear down a session the oracle
/// merely failed to inspect.
pub struct TtyChecker {
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl TtyChecker {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns whether the terminal behind `tty` is still alive.
    ///
    /// `None` means the session never resolved a terminal identifier;
    /// such sessions are only ever evicted by staleness, so this is alive.
    pub fn is_alive(&self, tty: Option<&str>) -> bool {
        let Some(tty) = tty else {
            return true;
        };

        let now = Instant::now();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = cache.get(tty) {
            if now.duration_since(entry.checked_at) < CACHE_TTL {
                return entry.alive;
            }
        }

        let alive = probe(tty);
        cache.insert(
            tty.to_string(),
            CacheEntry {
                alive,
                checked_at: now,
            },
        );
        evict_oldest(&mut cache);
        alive
    }

    /// Drops every cached result, forcing fresh probes. For test isolation.
    pub fn clear(&self) {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

impl Default for TtyChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn evict_oldest(cache: &mut HashMap<String, CacheEntry>) {
    while cache.len() > MAX_CACHE_ENTRIES {
        let oldest = cache
            .iter()
            .min_by_key(|(_, entry)| entry.checked_at)
            .map(|(tty, _)| tty.clone());
        match oldest {
            Some(tty) => {
                cache.remove(&tty);
            }
            None => break,
        }
    }
}

/// Probes one identifier, dispatching on its shape.
///
/// `proc_<pid>` identifiers check process liveness, absolute paths check
/// existence, anything else is assumed alive.
fn probe(tty: &str) -> bool {
    if let Some(pid) = parse_proc_id(tty) {
        return is_pid_alive(pid);
    }
    if tty.starts_with('/') {
        return Path::new(tty).exists();
    }
    true
}

fn parse_proc_id(tty: &str) -> Option<u32> {
    tty.strip_prefix("proc_")?.parse().ok()
}

/// Returns whether a process with the given pid exists.
///
/// Signal 0 probes without delivering. EPERM still means the process
/// exists; only a clean ESRCH counts as dead.
#[cfg(unix)]
pub fn is_pid_alive(pid: u32) -> bool {
    let pid = match libc::pid_t::try_from(pid) {
        Ok(pid) => pid,
        Err(_) => return false,
    };
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// No portable probe off Unix; assume alive and let staleness evict.
#[cfg(not(unix))]
pub fn is_pid_alive(_pid: u32) -> bool {
    true
}
