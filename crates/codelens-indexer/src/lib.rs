//! Indexer orchestration (§4.5): the full read -> parse -> extract ->
//! persist pipeline for one file, and bounded-parallel/recursive-directory
//! entry points over it.
//!
//! Grounded on `arbor-cli::commands::index` (progress-style per-file
//! reporting) and `arbor-server::sync_server::run_background_indexer`
//! (read -> parse -> mutate-store -> broadcast, where "broadcast" becomes
//! `on_file_indexed` here). New crate relative to the teacher, which
//! spread this logic across a CLI command and a server background task;
//! consolidated because both the Watcher and the CLI need the identical
//! pipeline.

pub mod error;

use codelens_core::{Language, ParserBridge, Symbol};
use codelens_store::Store;
use error::{IndexError, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Tunables enumerated in §6, given names instead of bare literals.
#[derive(Debug, Clone, Copy)]
pub struct IndexerConfig {
    pub max_concurrency: usize,
    pub per_file_timeout_ms: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            per_file_timeout_ms: 30_000,
        }
    }
}

/// Default directory-name fragments excluded from `index_directory`,
/// extensible via `DirectoryOptions::exclude`.
pub const DEFAULT_EXCLUDES: &[&str] = &["/_build/", "/deps/", "/node_modules/", "/.git/"];

#[derive(Debug, Clone, Default)]
pub struct DirectoryOptions {
    pub exclude: Vec<String>,
}

/// Summary returned per successfully indexed file (§4.5 step 7).
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub file_path: String,
    pub symbols_added: usize,
    pub references_added: usize,
}

type OnFileIndexed = dyn Fn(&str, &[Symbol]) + Send + Sync;

/// Orchestrates the Parser Bridge, Extractor, and Store for single files,
/// batches, and whole directories.
#[derive(Clone)]
pub struct Indexer {
    bridge: Arc<ParserBridge>,
    store: Arc<Store>,
    config: IndexerConfig,
    on_file_indexed: Arc<Mutex<Option<Arc<OnFileIndexed>>>>,
}

impl Indexer {
    pub fn new(bridge: Arc<ParserBridge>, store: Arc<Store>) -> Self {
        Self::with_config(bridge, store, IndexerConfig::default())
    }

    pub fn with_config(bridge: Arc<ParserBridge>, store: Arc<Store>, config: IndexerConfig) -> Self {
        Self {
            bridge,
            store,
            config,
            on_file_indexed: Arc::new(Mutex::new(None)),
        }
    }

    /// Registers the optional `on_file_indexed` subscriber (§6). Only one
    /// subscriber at a time, matching the "single optional hook" contract;
    /// registering again replaces the previous one.
    pub fn set_on_file_indexed<F>(&self, callback: F)
    where
        F: Fn(&str, &[Symbol]) + Send + Sync + 'static,
    {
        *self.on_file_indexed.lock().unwrap() = Some(Arc::new(callback));
    }

    /// Step-by-step pipeline for one file (§4.5). A parse error, unknown
    /// language, or missing file short-circuits without touching the
    /// store; the Store's own transaction guarantees a constraint
    /// violation leaves prior rows intact.
    pub fn index_file(&self, path: &Path) -> Result<IndexOutcome> {
        let language = Language::from_path(path)
            .ok_or_else(|| IndexError::UnknownLanguage(path.to_path_buf()))?;

        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IndexError::FileNotFound(path.to_path_buf())
            } else {
                IndexError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let file_hash = codelens_core::hash::hash(&bytes);

        let source = String::from_utf8(bytes).map_err(|_| {
            IndexError::Parse(codelens_core::ParseError::ParserError(format!(
                "{} is not valid UTF-8",
                path.display()
            )))
        })?;

        let tree = self.bridge.parse(&source, language)?;
        let (symbols, references) = codelens_core::extractor::extract(&self.bridge, &tree, &source)?;

        let canonical_path = std::fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned();

        let summary = self
            .store
            .replace_file(&canonical_path, &symbols, &references, &file_hash)?;

        let outcome = IndexOutcome {
            file_path: canonical_path.clone(),
            symbols_added: summary.symbols_written,
            references_added: summary.references_written,
        };

        if let Some(callback) = self.on_file_indexed.lock().unwrap().clone() {
            // Best-effort: a subscriber panic is logged and swallowed
            // (§5), never allowed to fail the index operation itself.
            let persisted = self.store.symbols_in_file(&canonical_path).unwrap_or_default();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(&canonical_path, &persisted);
            }));
            if result.is_err() {
                tracing::warn!(file = %canonical_path, "on_file_indexed callback panicked");
            }
        }

        tracing::info!(
            file = %outcome.file_path,
            symbols = outcome.symbols_added,
            references = outcome.references_added,
            "indexed file"
        );

        Ok(outcome)
    }

    /// Indexes every path in `paths` in parallel, bounded to
    /// `config.max_concurrency` concurrent files, each with a
    /// `config.per_file_timeout_ms` timeout. One failing file never
    /// cancels the others.
    pub async fn index_files(&self, paths: &[PathBuf]) -> Vec<Result<IndexOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let timeout = Duration::from_millis(self.config.per_file_timeout_ms);

        let mut tasks = Vec::with_capacity(paths.len());
        for path in paths {
            let semaphore = semaphore.clone();
            let indexer = self.clone();
            let path = path.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let path_for_timeout = path.clone();
                let blocking = tokio::task::spawn_blocking(move || indexer.index_file(&path));
                match tokio::time::timeout(timeout, blocking).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_err)) => Err(IndexError::Join(path_for_timeout, join_err.to_string())),
                    Err(_elapsed) => Err(IndexError::Timeout(path_for_timeout)),
                }
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(match task.await {
                Ok(result) => result,
                Err(join_err) => Err(IndexError::Join(PathBuf::new(), join_err.to_string())),
            });
        }
        results
    }

    /// Recursively enumerates regular files under `root`, keeps those with
    /// a supported extension, skips the default (plus caller-supplied)
    /// exclusions, then indexes the rest via `index_files`.
    pub async fn index_directory(&self, root: &Path, opts: &DirectoryOptions) -> Result<Vec<Result<IndexOutcome>>> {
        if !root.is_dir() {
            return Err(IndexError::NotADirectory(root.to_path_buf()));
        }

        let excludes: Vec<&str> = DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(opts.exclude.iter().map(String::as_str))
            .collect();

        let mut paths = Vec::new();
        let mut walker = WalkBuilder::new(root);
        walker
            .hidden(false)
            .git_ignore(false)
            .git_exclude(false)
            .ignore(false);
        for entry in walker.build() {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if Language::from_path(path).is_none() {
                continue;
            }
            let path_str = path.to_string_lossy();
            if excludes.iter().any(|pattern| path_str.contains(pattern)) {
                continue;
            }
            paths.push(path.to_path_buf());
        }

        Ok(self.index_files(&paths).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn indexer() -> Indexer {
        let bridge = Arc::new(ParserBridge::new().unwrap());
        let store = Arc::new(Store::open_in_memory().unwrap());
        Indexer::new(bridge, store)
    }

    #[test]
    fn unknown_extension_short_circuits_before_reading() {
        let indexer = indexer();
        let result = indexer.index_file(Path::new("/nonexistent/path.rb"));
        assert!(matches!(result, Err(IndexError::UnknownLanguage(_))));
    }

    #[test]
    fn empty_file_yields_zero_symbols_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.py");
        std::fs::File::create(&path).unwrap();

        let indexer = indexer();
        let outcome = indexer.index_file(&path).unwrap();
        assert_eq!(outcome.symbols_added, 0);
        assert_eq!(outcome.references_added, 0);
    }

    #[test]
    fn reindexing_unmodified_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "def bar():\n    return 1\n").unwrap();

        let indexer = indexer();
        let first = indexer.index_file(&path).unwrap();
        let second = indexer.index_file(&path).unwrap();
        assert_eq!(first.symbols_added, second.symbols_added);
        assert_eq!(first.references_added, second.references_added);
    }

    #[tokio::test]
    async fn index_directory_skips_default_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "foo();").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/app.js"), "bar();").unwrap();

        let indexer = indexer();
        let results = indexer
            .index_directory(dir.path(), &DirectoryOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        let outcome = results[0].as_ref().unwrap();
        assert!(outcome.file_path.ends_with("src/app.js"));
    }
}
