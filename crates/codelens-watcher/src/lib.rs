//! Filesystem watcher with debounce/coalescing (§4.7).
//!
//! Grounded on `arbor-server::sync_server`'s watch loop — a pending-path
//! map plus a single timer, dispatching into a background indexer task —
//! restructured around `notify-debouncer-mini` (declared in the teacher's
//! own `arbor-watcher` dependency set but not yet wired up in the one
//! retrieved source file) so the debounce timer is the library's concern
//! instead of a hand-rolled poll loop. The "process-wide named actor with
//! mutable state" re-architecture from the Design Notes: an owned
//! scheduler handle (the `Debouncer`), an owned pending-change count, and
//! a mutex-protected API — one instance per process, no shared mutable
//! state with callers.

pub mod error;

use codelens_indexer::Indexer;
use codelens_store::Store;
use error::WatchError;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The one tunable enumerated in §6; 100ms per the spec default.
#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WatcherStatus {
    pub watched_dirs: usize,
    pub pending_change_count: usize,
    pub active: bool,
}

struct Inner {
    watched: HashSet<PathBuf>,
    active: bool,
    pending_change_count: usize,
    debouncer: Option<Debouncer<notify::RecommendedWatcher>>,
}

/// Keeps the Store in sync with the filesystem over time. One instance
/// owns one underlying OS subscription and one debounce timer, shared
/// across every watched directory.
pub struct Watcher {
    indexer: Arc<Indexer>,
    store: Arc<Store>,
    config: WatcherConfig,
    inner: Arc<Mutex<Inner>>,
}

impl Watcher {
    pub fn new(indexer: Arc<Indexer>, store: Arc<Store>) -> Self {
        Self::with_config(indexer, store, WatcherConfig::default())
    }

    pub fn with_config(indexer: Arc<Indexer>, store: Arc<Store>, config: WatcherConfig) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            watched: HashSet::new(),
            active: false,
            pending_change_count: 0,
            debouncer: None,
        }));

        let watcher = Self {
            indexer,
            store,
            config,
            inner,
        };
        watcher.start();
        watcher
    }

    /// Capability probe at startup (§9 Design Notes): build the
    /// underlying debouncer; if the platform subscription can't be
    /// created, degrade to passive mode rather than failing construction.
    fn start(&self) {
        let indexer = self.indexer.clone();
        let store = self.store.clone();
        let inner_for_events = self.inner.clone();

        let result = new_debouncer(
            Duration::from_millis(self.config.debounce_ms),
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    let paths: HashSet<PathBuf> = events
                        .into_iter()
                        .map(|e| e.path)
                        .filter(|p| codelens_core::Language::from_path(p).is_some())
                        .collect();
                    dispatch(paths, &indexer, &store, &inner_for_events);
                }
                Err(e) => tracing::warn!(error = %e, "watcher subscription error"),
            },
        );

        let mut inner = self.inner.lock().unwrap();
        match result {
            Ok(debouncer) => {
                inner.debouncer = Some(debouncer);
                inner.active = true;
                tracing::info!("filesystem watcher active");
            }
            Err(e) => {
                tracing::warn!(error = %e, "filesystem watch subscription unavailable, degrading to passive mode");
                inner.active = false;
            }
        }
    }

    /// Begins observing `dir`. Degrades gracefully (§4.7): if the
    /// underlying subscription can't watch this directory, it is still
    /// recorded as "watched" and a warning is logged.
    pub fn watch(&self, dir: &Path) -> error::Result<()> {
        if !dir.is_dir() {
            return Err(WatchError::NotADirectory(dir.to_path_buf()));
        }
        let canonical = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());

        let mut inner = self.inner.lock().unwrap();
        inner.watched.insert(canonical.clone());
        match inner.debouncer.as_mut() {
            Some(debouncer) => {
                if let Err(e) = debouncer.watcher().watch(&canonical, RecursiveMode::Recursive) {
                    tracing::warn!(dir = %canonical.display(), error = %e, "failed to subscribe, tracking passively");
                }
            }
            None => {
                tracing::warn!(dir = %canonical.display(), "watcher inactive, tracking directory passively");
            }
        }
        Ok(())
    }

    pub fn unwatch(&self, dir: &Path) {
        let canonical = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let mut inner = self.inner.lock().unwrap();
        inner.watched.remove(&canonical);
        if let Some(debouncer) = inner.debouncer.as_mut() {
            let _ = debouncer.watcher().unwatch(&canonical);
        }
    }

    pub fn watched(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().watched.iter().cloned().collect()
    }

    pub fn status(&self) -> WatcherStatus {
        let inner = self.inner.lock().unwrap();
        WatcherStatus {
            watched_dirs: inner.watched.len(),
            pending_change_count: inner.pending_change_count,
            active: inner.active,
        }
    }
}

/// One concurrent task per coalesced path, unordered, per §4.7. A path
/// that still exists is re-indexed; one that vanished is removed from
/// the store — notify-debouncer-mini's mini event kind doesn't
/// distinguish create/modify/remove, so existence on disk at dispatch
/// time is the signal, exactly as spec'd.
fn dispatch(paths: HashSet<PathBuf>, indexer: &Arc<Indexer>, store: &Arc<Store>, inner: &Arc<Mutex<Inner>>) {
    if paths.is_empty() {
        return;
    }
    {
        let mut guard = inner.lock().unwrap();
        guard.pending_change_count += paths.len();
    }
    for path in paths {
        let indexer = indexer.clone();
        let store = store.clone();
        let inner = inner.clone();
        std::thread::spawn(move || {
            if path.exists() {
                if let Err(e) = indexer.index_file(&path) {
                    tracing::warn!(file = %path.display(), error = %e, "re-index failed");
                }
            } else {
                let file_path = path.to_string_lossy().into_owned();
                if let Err(e) = store.remove_file(&file_path) {
                    tracing::error!(file = %file_path, error = %e, "failed to remove deleted file from store");
                }
            }
            let mut guard = inner.lock().unwrap();
            guard.pending_change_count = guard.pending_change_count.saturating_sub(1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watcher() -> Watcher {
        let bridge = Arc::new(codelens_core::ParserBridge::new().unwrap());
        let store = Arc::new(Store::open_in_memory().unwrap());
        let indexer = Arc::new(Indexer::new(bridge, store.clone()));
        Watcher::new(indexer, store)
    }

    #[test]
    fn watch_rejects_non_directory() {
        let w = watcher();
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not_a_dir.txt");
        std::fs::write(&file_path, "x").unwrap();
        let result = w.watch(&file_path);
        assert!(matches!(result, Err(WatchError::NotADirectory(_))));
    }

    #[test]
    fn watch_and_unwatch_update_watched_list() {
        let w = watcher();
        let dir = tempfile::tempdir().unwrap();
        w.watch(dir.path()).unwrap();
        assert_eq!(w.watched().len(), 1);
        w.unwatch(dir.path());
        assert_eq!(w.watched().len(), 0);
    }

    #[test]
    fn status_reports_active_when_subscription_succeeds() {
        let w = watcher();
        assert!(w.status().active);
    }
}
