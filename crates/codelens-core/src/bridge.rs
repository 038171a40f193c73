//! Parser Bridge (§4.1): a thread-safe parsing front-end over a fixed set
//! of Tree-sitter grammars.
//!
//! Grounded on `arbor-core::ArborParser` (`parser_v2.rs`): grammar objects
//! and compiled queries are built once at construction and shared; a fresh
//! `tree_sitter::Parser` is created per call so that `parse` calls from
//! distinct threads never contend on parser state (§4.1's concurrency
//! requirement).

use crate::error::{ParseError, Result};
use crate::model::Language;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tree_sitter::{InputEdit, Parser, Point, Query, QueryCursor, Tree};

/// A single `(start_byte, old_end_byte, new_end_byte)` edit, as described
/// in §4.1.
#[derive(Debug, Clone, Copy)]
pub struct Edit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
}

/// One captured match from a tree query, flattened for the caller (§4.1).
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub capture_name: String,
    pub text: String,
    pub node_kind: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

/// An opaque, owned parse tree plus the language it was parsed with.
///
/// Consumed by extraction and by further queries. Ownership follows §3:
/// whichever component asked for it (Indexer or an external caller) keeps
/// it scoped to that operation.
pub struct ParsedTree {
    pub(crate) tree: Tree,
    pub language: Language,
}

impl ParsedTree {
    pub fn sexp(&self) -> String {
        self.tree.root_node().to_sexp()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

fn grammar_for(language: Language) -> tree_sitter::Language {
    match language {
        Language::Elixir => tree_sitter_elixir::language(),
        Language::Python => tree_sitter_python::language(),
        Language::Javascript => tree_sitter_javascript::language(),
        Language::Typescript => tree_sitter_typescript::language_typescript(),
        Language::Tsx => tree_sitter_typescript::language_tsx(),
    }
}

/// The fixed set of languages the bridge knows how to parse, in the order
/// they appear in §3.
pub const SUPPORTED_LANGUAGES: [Language; 5] = [
    Language::Elixir,
    Language::Python,
    Language::Javascript,
    Language::Typescript,
    Language::Tsx,
];

/// Thread-safe parsing front-end.
///
/// Construction compiles and validates the grammar for every supported
/// language; a failure here is fatal at startup (§4.1/§7), since a
/// grammar that can't load at all means the process can never parse.
pub struct ParserBridge {
    grammars: HashMap<Language, tree_sitter::Language>,
    /// Queries compiled from literal pattern strings, cached by
    /// (language, pattern) so repeated `query()` calls with the same
    /// pattern don't recompile it.
    query_cache: RwLock<HashMap<(Language, String), Arc<Query>>>,
}

impl ParserBridge {
    /// Builds the bridge, validating every grammar can be loaded.
    pub fn new() -> Result<Self> {
        let mut grammars = HashMap::new();
        for &language in &SUPPORTED_LANGUAGES {
            let grammar = grammar_for(language);
            // Constructing a throwaway parser checks the grammar is
            // actually usable with this tree-sitter runtime, not just
            // linkable.
            let mut probe = Parser::new();
            probe
                .set_language(&grammar)
                .map_err(|e| ParseError::ParserError(format!("{language}: {e}")))?;
            grammars.insert(language, grammar);
        }
        Ok(Self {
            grammars,
            query_cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn supported_languages(&self) -> &[Language] {
        &SUPPORTED_LANGUAGES
    }

    /// Parses `source` as `language`, returning a fresh tree.
    pub fn parse(&self, source: &str, language: Language) -> Result<ParsedTree> {
        let grammar = self
            .grammars
            .get(&language)
            .ok_or_else(|| ParseError::ParserError(format!("grammar not loaded: {language}")))?;

        let mut parser = Parser::new();
        parser
            .set_language(grammar)
            .map_err(|e| ParseError::ParserError(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::ParserError("tree-sitter returned no tree".into()))?;

        Ok(ParsedTree { tree, language })
    }

    /// Re-parses `source` incrementally against `old_tree`, applying
    /// `edits` first so Tree-sitter can reuse unaffected subtrees. The
    /// resulting tree must be observationally identical to a fresh
    /// `parse(source, language)` for all downstream queries (§4.1).
    pub fn parse_incremental(
        &self,
        source: &str,
        mut old_tree: ParsedTree,
        old_source: &str,
        edits: &[Edit],
    ) -> Result<ParsedTree> {
        let grammar = self
            .grammars
            .get(&old_tree.language)
            .ok_or_else(|| {
                ParseError::ParserError(format!("grammar not loaded: {}", old_tree.language))
            })?;

        for edit in edits {
            let input_edit = InputEdit {
                start_byte: edit.start_byte,
                old_end_byte: edit.old_end_byte,
                new_end_byte: edit.new_end_byte,
                start_position: byte_to_point(old_source, edit.start_byte),
                old_end_position: byte_to_point(old_source, edit.old_end_byte),
                new_end_position: byte_to_point(source, edit.new_end_byte),
            };
            old_tree.tree.edit(&input_edit);
        }

        let mut parser = Parser::new();
        parser
            .set_language(grammar)
            .map_err(|e| ParseError::ParserError(e.to_string()))?;

        let tree = parser
            .parse(source, Some(&old_tree.tree))
            .ok_or_else(|| ParseError::ParserError("tree-sitter returned no tree".into()))?;

        Ok(ParsedTree {
            tree,
            language: old_tree.language,
        })
    }

    /// Runs a literal query pattern over `tree`, returning every capture
    /// as a flattened `QueryMatch`.
    pub fn query(&self, tree: &ParsedTree, pattern: &str, source: &str) -> Result<Vec<QueryMatch>> {
        let query = self.compiled_query(tree.language, pattern)?;

        let mut cursor = QueryCursor::new();
        let mut results = Vec::new();
        for m in cursor.matches(&query, tree.tree.root_node(), source.as_bytes()) {
            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize].to_string();
                let text = capture
                    .node
                    .utf8_text(source.as_bytes())
                    .unwrap_or("")
                    .to_string();
                results.push(QueryMatch {
                    capture_name,
                    text,
                    node_kind: capture.node.kind().to_string(),
                    start_line: capture.node.start_position().row as u32 + 1,
                    start_col: capture.node.start_position().column as u32,
                    end_line: capture.node.end_position().row as u32 + 1,
                    end_col: capture.node.end_position().column as u32,
                });
            }
        }
        Ok(results)
    }

    fn compiled_query(&self, language: Language, pattern: &str) -> Result<Arc<Query>> {
        let key = (language, pattern.to_string());
        if let Some(q) = self.query_cache.read().unwrap().get(&key) {
            return Ok(q.clone());
        }

        let grammar = self
            .grammars
            .get(&language)
            .ok_or_else(|| ParseError::ParserError(format!("grammar not loaded: {language}")))?;
        let compiled = Arc::new(
            Query::new(grammar, pattern).map_err(|e| ParseError::QueryError(e.to_string()))?,
        );

        self.query_cache
            .write()
            .unwrap()
            .insert(key, compiled.clone());
        Ok(compiled)
    }
}

/// Converts a byte offset into a Tree-sitter `Point` (row/column) by
/// scanning the preceding bytes. Used to build `InputEdit`s from the
/// byte-only edit description in §4.1.
fn byte_to_point(source: &str, byte_offset: usize) -> Point {
    let prefix = &source.as_bytes()[..byte_offset.min(source.len())];
    let row = prefix.iter().filter(|&&b| b == b'\n').count();
    let col = match prefix.iter().rposition(|&b| b == b'\n') {
        Some(last_newline) => byte_offset - last_newline - 1,
        None => byte_offset,
    };
    Point::new(row, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_python_without_error() {
        let bridge = ParserBridge::new().expect("bridge should initialize");
        let tree = bridge
            .parse("def greet(name):\n    return name\n", Language::Python)
            .unwrap();
        assert!(!tree.sexp().is_empty());
    }

    #[test]
    fn supported_languages_is_the_fixed_five() {
        let bridge = ParserBridge::new().unwrap();
        assert_eq!(bridge.supported_languages().len(), 5);
    }

    #[test]
    fn query_returns_captures_with_positions() {
        let bridge = ParserBridge::new().unwrap();
        let source = "def greet(name):\n    return name\n";
        let tree = bridge.parse(source, Language::Python).unwrap();
        let matches = bridge
            .query(
                &tree,
                "(function_definition name: (identifier) @name)",
                source,
            )
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "greet");
        assert_eq!(matches[0].start_line, 1);
    }

    #[test]
    fn incremental_parse_matches_fresh_parse() {
        let bridge = ParserBridge::new().unwrap();
        let original = "def greet(name):\n    return name\n";
        let tree = bridge.parse(original, Language::Python).unwrap();

        let updated = "def greet(name, title):\n    return name\n";
        let edit = Edit {
            start_byte: 10,
            old_end_byte: 14,
            new_end_byte: 21,
        };

        let incremental = bridge
            .parse_incremental(updated, tree, original, &[edit])
            .unwrap();
        let fresh = bridge.parse(updated, Language::Python).unwrap();

        assert_eq!(incremental.sexp(), fresh.sexp());
    }

    #[test]
    fn byte_to_point_handles_multiline_offsets() {
        let source = "abc\ndef\nghi";
        assert_eq!(byte_to_point(source, 0), Point::new(0, 0));
        assert_eq!(byte_to_point(source, 4), Point::new(1, 0));
        assert_eq!(byte_to_point(source, 9), Point::new(2, 1));
    }
}
