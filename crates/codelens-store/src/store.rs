//! Durable, transactional persistence (§4.4).
//!
//! Grounded on `arbor-graph::store::GraphStore`'s shape (`open<P:
//! AsRef<Path>>`, a thiserror error enum, tempfile-backed tests) but the
//! backing engine is `rusqlite` instead of `sled`, and persistence is
//! per-row/per-file rather than a single bincode-serialized snapshot,
//! because §3/§6 require uniqueness and foreign-key constraints that only
//! a relational engine enforces for us.

use crate::schema;
use codelens_core::{ExtractedReference, ExtractedSymbol, SymbolId};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Counts returned by `replace_file`, per §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub symbols_written: usize,
    pub references_written: usize,
}

/// The relational store. A single `rusqlite::Connection` behind a mutex
/// is the serialization point for writes (§5): SQLite only ever allows
/// one writer at a time regardless, so this does not add contention
/// beyond what the engine already imposes, while keeping `Store: Send +
/// Sync` the way `Arc<Store>` callers (Indexer, Watcher, CLI) need.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if absent) the SQLite database at `path` and
    /// applies the schema.
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|source| crate::error::StoreError::Open {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        schema::apply(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory store, used by tests and by callers that don't need
    /// durability across process restarts.
    pub fn open_in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::apply(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deletes every row for `file_path`, then inserts `symbols` and
    /// `references` in the same transaction (§4.4). `parent`/`container`
    /// indices in the extracted records are resolved to real row ids
    /// within this same transaction — the two-conceptual-pass approach
    /// from §9's Design Notes, implemented here as insert-then-update
    /// rather than two separate insert passes, since SQLite rowids are
    /// known immediately after each insert.
    pub fn replace_file(
        &self,
        file_path: &str,
        symbols: &[ExtractedSymbol],
        references: &[ExtractedReference],
        file_hash: &str,
    ) -> crate::error::Result<ReplaceSummary> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM symbol_references WHERE file_path = ?1", [file_path])?;
        tx.execute("DELETE FROM code_symbols WHERE file_path = ?1", [file_path])?;

        let now = chrono::Utc::now().to_rfc3339();
        let mut symbol_ids: Vec<i64> = Vec::with_capacity(symbols.len());

        {
            let mut insert_symbol = tx.prepare_cached(
                "INSERT OR REPLACE INTO code_symbols
                    (file_path, name, qualified_name, kind, language, visibility,
                     start_line, start_col, end_line, end_col, signature, doc,
                     metadata, file_hash, indexed_at, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, NULL)",
            )?;

            for s in symbols {
                insert_symbol.execute(rusqlite::params![
                    file_path,
                    s.name,
                    s.qualified_name,
                    s.kind.as_str(),
                    s.language.as_str(),
                    s.visibility.as_str(),
                    s.start_line,
                    s.start_col,
                    s.end_line,
                    s.end_col,
                    s.signature,
                    s.doc,
                    s.metadata.to_string(),
                    file_hash,
                    now,
                ])?;
                symbol_ids.push(tx.last_insert_rowid());
            }
        }

        {
            let mut update_parent =
                tx.prepare_cached("UPDATE code_symbols SET parent_id = ?1 WHERE id = ?2")?;
            for (i, s) in symbols.iter().enumerate() {
                if let Some(parent_idx) = s.parent {
                    if let Some(&parent_id) = symbol_ids.get(parent_idx) {
                        update_parent.execute(rusqlite::params![parent_id, symbol_ids[i]])?;
                    }
                }
            }
        }

        {
            let mut insert_reference = tx.prepare_cached(
                "INSERT OR REPLACE INTO symbol_references
                    (file_path, name, qualified_name, kind, language, line, col,
                     end_line, end_col, target_module, metadata, file_hash,
                     symbol_id, container_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, NULL, ?13)",
            )?;

            for r in references {
                let qualified_name = r
                    .qualified_name
                    .clone()
                    .unwrap_or_else(|| match &r.target_module {
                        Some(module) => format!("{module}.{}", r.name),
                        None => r.name.clone(),
                    });
                let container_id = r.container.and_then(|idx| symbol_ids.get(idx)).copied();

                insert_reference.execute(rusqlite::params![
                    file_path,
                    r.name,
                    qualified_name,
                    r.kind.as_str(),
                    r.language.as_str(),
                    r.line,
                    r.col,
                    r.end_line,
                    r.end_col,
                    r.target_module,
                    r.metadata.to_string(),
                    file_hash,
                    container_id,
                ])?;
            }
        }

        tx.commit()?;

        Ok(ReplaceSummary {
            symbols_written: symbols.len(),
            references_written: references.len(),
        })
    }

    /// Deletes every row for `file_path`. Idempotent (§4.4): a second
    /// call on an already-absent file deletes zero rows and succeeds.
    pub fn remove_file(&self, file_path: &str) -> crate::error::Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let refs_deleted =
            tx.execute("DELETE FROM symbol_references WHERE file_path = ?1", [file_path])?;
        let symbols_deleted =
            tx.execute("DELETE FROM code_symbols WHERE file_path = ?1", [file_path])?;
        tx.commit()?;
        Ok(refs_deleted + symbols_deleted)
    }

    /// Resolves a symbol id to its qualified name, used by the Query
    /// Surface's `call_graph` when building caller rows.
    pub(crate) fn qualified_name_of(&self, id: SymbolId) -> crate::error::Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached("SELECT qualified_name FROM code_symbols WHERE id = ?1")?;
        let mut rows = stmt.query([id.0])?;
        Ok(match rows.next()? {
            Some(row) => Some(row.get(0)?),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelens_core::{Language, SymbolKind, Visibility};

    fn sample_symbol(name: &str, parent: Option<usize>) -> ExtractedSymbol {
        ExtractedSymbol {
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: SymbolKind::Function,
            language: Language::Python,
            visibility: Visibility::Public,
            start_line: 1,
            start_col: 0,
            end_line: 2,
            end_col: 0,
            signature: None,
            doc: None,
            metadata: serde_json::Value::Null,
            parent,
        }
    }

    #[test]
    fn replace_file_writes_and_resolves_parent() {
        let store = Store::open_in_memory().unwrap();
        let symbols = vec![sample_symbol("Outer", None), sample_symbol("inner", Some(0))];
        let summary = store
            .replace_file("/p/a.py", &symbols, &[], "hash1")
            .unwrap();
        assert_eq!(summary.symbols_written, 2);

        let conn = store.conn();
        let parent_id: Option<i64> = conn
            .query_row(
                "SELECT parent_id FROM code_symbols WHERE name = 'inner'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(parent_id.is_some());
    }

    #[test]
    fn replace_file_is_idempotent_on_unchanged_input() {
        let store = Store::open_in_memory().unwrap();
        let symbols = vec![sample_symbol("foo", None)];
        store.replace_file("/p/a.py", &symbols, &[], "hash1").unwrap();
        let second = store.replace_file("/p/a.py", &symbols, &[], "hash1").unwrap();
        assert_eq!(second.symbols_written, 1);

        let conn = store.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM code_symbols WHERE file_path = '/p/a.py'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn remove_file_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let symbols = vec![sample_symbol("foo", None)];
        store.replace_file("/p/a.py", &symbols, &[], "hash1").unwrap();
        assert_eq!(store.remove_file("/p/a.py").unwrap(), 1);
        assert_eq!(store.remove_file("/p/a.py").unwrap(), 0);
    }
}
