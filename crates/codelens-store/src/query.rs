//! Query Surface (§4.6): read-only navigation over the committed store.
//! Every operation materializes its full result list — no lazy cursors,
//! per spec.

use crate::error::Result;
use crate::row::{reference_from_row, symbol_from_row};
use crate::store::Store;
use codelens_core::{Reference, Symbol, SymbolKind};
use rusqlite::types::Value as SqlValue;
use std::collections::HashMap;

/// Optional filters shared by `find_by_name`/`search`.
#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    pub kind: Option<SymbolKind>,
    pub language: Option<codelens_core::Language>,
    pub limit: Option<usize>,
}

/// Optional filters for `find_references`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFilter {
    pub kind: Option<codelens_core::ReferenceKind>,
    pub language: Option<codelens_core::Language>,
    pub limit: Option<usize>,
}

/// One side of `call_graph`'s caller list: a usage site plus the
/// qualified name of whatever symbol contains it, if any.
#[derive(Debug, Clone)]
pub struct CallerRef {
    pub reference: Reference,
    pub container_qualified_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CallGraph {
    pub callers: Vec<CallerRef>,
    pub callees: Vec<Reference>,
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub total_symbols: i64,
    pub total_references: i64,
    pub indexed_files: i64,
    pub symbols_by_kind: HashMap<String, i64>,
}

const DEFAULT_SEARCH_LIMIT: usize = 50;

impl Store {
    /// Exact match on `name`, ordered `(file_path asc, start_line asc)`.
    pub fn find_by_name(&self, name: &str, filter: &SymbolFilter) -> Result<Vec<Symbol>> {
        let mut sql = String::from(
            "SELECT * FROM code_symbols WHERE name = ?1",
        );
        let mut params: Vec<SqlValue> = vec![SqlValue::from(name.to_string())];
        push_symbol_filter(&mut sql, &mut params, filter);
        sql.push_str(" ORDER BY file_path ASC, start_line ASC");
        push_limit(&mut sql, &mut params, filter.limit);

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), symbol_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Exact match on `qualified_name`, same ordering as `find_by_name`.
    pub fn find_by_qualified_name(&self, qname: &str) -> Result<Vec<Symbol>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM code_symbols WHERE qualified_name = ?1
             ORDER BY file_path ASC, start_line ASC",
        )?;
        let rows = stmt.query_map([qname], symbol_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// First row where `kind` is a definition kind AND (`name = x` OR
    /// `qualified_name = x`), ordered by `file_path asc`.
    pub fn find_definition(&self, name_or_qname: &str) -> Result<Option<Symbol>> {
        let conn = self.conn();
        let definition_kinds = ["function", "class", "module", "method", "macro"];
        let placeholders = definition_kinds
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT * FROM code_symbols
             WHERE kind IN ({placeholders}) AND (name = ? OR qualified_name = ?)
             ORDER BY file_path ASC
             LIMIT 1"
        );
        let mut params: Vec<SqlValue> = definition_kinds.iter().map(|k| SqlValue::from(k.to_string())).collect();
        params.push(SqlValue::from(name_or_qname.to_string()));
        params.push(SqlValue::from(name_or_qname.to_string()));

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
        match rows.next()? {
            Some(row) => Ok(Some(symbol_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Matches `name` or `qualified_name`, ordered `(file_path asc, line
    /// asc)`.
    pub fn find_references(&self, name_or_qname: &str, filter: &ReferenceFilter) -> Result<Vec<Reference>> {
        let mut sql = String::from(
            "SELECT * FROM symbol_references WHERE (name = ?1 OR qualified_name = ?1)",
        );
        let mut params: Vec<SqlValue> = vec![SqlValue::from(name_or_qname.to_string())];
        push_reference_filter(&mut sql, &mut params, filter);
        sql.push_str(" ORDER BY file_path ASC, line ASC");
        push_limit(&mut sql, &mut params, filter.limit);

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), reference_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Case-insensitive substring match on `name` or `qualified_name`,
    /// ranked exact-name first, then prefix-name, then alphabetical —
    /// expressed as a `CASE`-computed rank column in the `ORDER BY` so
    /// the ranking rides on the same query that does the `LIKE` filter.
    pub fn search(&self, pattern: &str, filter: &SymbolFilter) -> Result<Vec<Symbol>> {
        let like_pattern = format!("%{}%", escape_like(pattern));
        let prefix_pattern = format!("{}%", escape_like(pattern));

        let mut sql = String::from(
            "SELECT *,
                CASE
                    WHEN name = ?1 THEN 0
                    WHEN name LIKE ?2 ESCAPE '\\' THEN 1
                    ELSE 2
                END AS rank
             FROM code_symbols
             WHERE (name LIKE ?3 ESCAPE '\\' OR qualified_name LIKE ?3 ESCAPE '\\')",
        );
        let mut params: Vec<SqlValue> = vec![
            SqlValue::from(pattern.to_string()),
            SqlValue::from(prefix_pattern),
            SqlValue::from(like_pattern),
        ];
        push_symbol_filter(&mut sql, &mut params, filter);
        sql.push_str(" ORDER BY rank ASC, name ASC");
        let limit = filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        sql.push_str(&format!(" LIMIT {limit}"));

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), symbol_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Ordered by position ascending.
    pub fn symbols_in_file(&self, path: &str) -> Result<Vec<Symbol>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM code_symbols WHERE file_path = ?1
             ORDER BY start_line ASC, start_col ASC",
        )?;
        let rows = stmt.query_map([path], symbol_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn references_in_file(&self, path: &str) -> Result<Vec<Reference>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM symbol_references WHERE file_path = ?1
             ORDER BY line ASC, col ASC",
        )?;
        let rows = stmt.query_map([path], reference_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// The innermost Symbol whose range covers `(line, col)`. Bounds are
    /// deliberately mixed strict/non-strict at start vs end, preserved
    /// exactly as specified (see DESIGN.md Open Questions) even though it
    /// can admit off-by-one behavior at exact endpoints. Tie-break by
    /// latest `start_line`, then tightest span.
    pub fn symbol_at(&self, path: &str, line: u32, col: u32) -> Result<Option<Symbol>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM code_symbols
             WHERE file_path = ?1
               AND (start_line < ?2 OR (start_line = ?2 AND start_col <= ?3))
               AND (end_line > ?2 OR (end_line = ?2 AND end_col >= ?3))
             ORDER BY start_line DESC, (end_line - start_line) ASC
             LIMIT 1",
        )?;
        let mut rows = stmt.query(rusqlite::params![path, line, col])?;
        match rows.next()? {
            Some(row) => Ok(Some(symbol_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Callers: call-kind references matching `name`, each augmented with
    /// its container's qualified name. Callees: call-kind references
    /// contained within the definition located via `find_definition`.
    pub fn call_graph(&self, name: &str) -> Result<CallGraph> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM symbol_references
             WHERE (name = ?1 OR qualified_name = ?1)
               AND kind IN ('call', 'qualified_call')
             ORDER BY file_path ASC, line ASC",
        )?;
        let rows = stmt.query_map([name], reference_from_row)?;
        let callers_raw = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        let mut callers = Vec::with_capacity(callers_raw.len());
        for reference in callers_raw {
            let container_qualified_name = match reference.container_id {
                Some(id) => self.qualified_name_of(id)?,
                None => None,
            };
            callers.push(CallerRef {
                reference,
                container_qualified_name,
            });
        }

        let definition = self.find_definition(name)?;
        let callees = match definition {
            Some(def) => {
                let conn = self.conn();
                let mut stmt = conn.prepare(
                    "SELECT * FROM symbol_references
                     WHERE container_id = ?1 AND kind IN ('call', 'qualified_call')
                     ORDER BY line ASC",
                )?;
                let rows = stmt.query_map([def.id.0], reference_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => Vec::new(),
        };

        Ok(CallGraph { callers, callees })
    }

    pub fn stats(&self) -> Result<Stats> {
        let conn = self.conn();
        let total_symbols: i64 =
            conn.query_row("SELECT COUNT(*) FROM code_symbols", [], |row| row.get(0))?;
        let total_references: i64 =
            conn.query_row("SELECT COUNT(*) FROM symbol_references", [], |row| row.get(0))?;
        let indexed_files: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT file_path) FROM code_symbols",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM code_symbols GROUP BY kind")?;
        let mut symbols_by_kind = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (kind, count) = row?;
            symbols_by_kind.insert(kind, count);
        }

        Ok(Stats {
            total_symbols,
            total_references,
            indexed_files,
            symbols_by_kind,
        })
    }
}

fn push_symbol_filter(sql: &mut String, params: &mut Vec<SqlValue>, filter: &SymbolFilter) {
    if let Some(kind) = filter.kind {
        params.push(SqlValue::from(kind.as_str().to_string()));
        sql.push_str(&format!(" AND kind = ?{}", params.len()));
    }
    if let Some(language) = filter.language {
        params.push(SqlValue::from(language.as_str().to_string()));
        sql.push_str(&format!(" AND language = ?{}", params.len()));
    }
}

fn push_reference_filter(sql: &mut String, params: &mut Vec<SqlValue>, filter: &ReferenceFilter) {
    if let Some(kind) = filter.kind {
        params.push(SqlValue::from(kind.as_str().to_string()));
        sql.push_str(&format!(" AND kind = ?{}", params.len()));
    }
    if let Some(language) = filter.language {
        params.push(SqlValue::from(language.as_str().to_string()));
        sql.push_str(&format!(" AND language = ?{}", params.len()));
    }
}

fn push_limit(sql: &mut String, _params: &mut [SqlValue], limit: Option<usize>) {
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
}

/// Escapes `%`/`_`/`\` in a user-supplied substring before wrapping it in
/// `LIKE` wildcards, so a search for a literal underscore doesn't match
/// every single character.
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use codelens_core::{ExtractedReference, ExtractedSymbol, Language, ReferenceKind, Visibility};

    fn setup() -> Store {
        let store = Store::open_in_memory().unwrap();
        let symbols = vec![
            ExtractedSymbol {
                name: "bar".into(),
                qualified_name: "bar".into(),
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
                parent: None,
            },
            ExtractedSymbol {
                name: "barista".into(),
                qualified_name: "barista".into(),
                kind: SymbolKind::Function,
                language: Language::Python,
                visibility: Visibility::Public,
                start_line: 4,
                start_col: 0,
                end_line: 5,
                end_col: 0,
                signature: None,
                doc: None,
                metadata: serde_json::Value::Null,
                parent: None,
            },
            ExtractedSymbol {
                name: "foobar".into(),
                qualified_name: "foobar".into(),
                kind: SymbolKind::Function,
                language: Language::Python,
                visibility: Visibility::Public,
                start_line: 7,
                start_col: 0,
                end_line: 8,
                end_col: 0,
                signature: None,
                doc: None,
                metadata: serde_json::Value::Null,
                parent: None,
            },
        ];
        let references = vec![ExtractedReference {
            name: "bar".into(),
            qualified_name: None,
            kind: ReferenceKind::Call,
            language: Language::Python,
            line: 10,
            col: 2,
            end_line: None,
            end_col: None,
            target_module: None,
            metadata: serde_json::Value::Null,
            container: None,
        }];
        store
            .replace_file("/p/a.py", &symbols, &references, "hash1")
            .unwrap();
        store
    }

    #[test]
    fn search_ranks_exact_then_prefix_then_substring() {
        let store = setup();
        let results = store
            .search(
                "bar",
                &SymbolFilter {
                    kind: Some(SymbolKind::Function),
                    language: None,
                    limit: Some(5),
                },
            )
            .unwrap();
        let names: Vec<_> = results.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bar", "barista", "foobar"]);
    }

    #[test]
    fn symbol_at_returns_innermost_match() {
        let store = setup();
        let found = store.symbol_at("/p/a.py", 1, 0).unwrap();
        assert_eq!(found.unwrap().name, "bar");

        let miss = store.symbol_at("/p/a.py", 100, 0).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn stats_counts_match_inserted_rows() {
        let store = setup();
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_symbols, 3);
        assert_eq!(stats.total_references, 1);
        assert_eq!(stats.indexed_files, 1);
        assert_eq!(stats.symbols_by_kind.get("function"), Some(&3));
    }

    #[test]
    fn find_definition_only_matches_definition_kinds() {
        let store = setup();
        let found = store.find_definition("bar").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().kind, SymbolKind::Function);
    }
}
