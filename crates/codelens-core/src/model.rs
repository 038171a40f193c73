//! Domain model: symbols, references, and the enums that constrain them.
//!
//! `Extracted*` types are what the Extractor hands to the Indexer: they
//! carry a `file_path` but no store-assigned identity yet. `parent`/
//! `container` point at another symbol in the *same* extraction batch by
//! position, not by database id — the Store resolves those positions to
//! real ids in the same transaction that inserts the rows (see
//! `codelens-store::store::replace_file`).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opaque row identifier for a persisted Symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub i64);

/// Opaque row identifier for a persisted Reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceId(pub i64);

/// A supported source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Elixir,
    Python,
    Javascript,
    Typescript,
    Tsx,
}

impl Language {
    /// Maps a file extension to a language, per the static table in §4.1.
    /// Returns `None` for unknown extensions ("unknown_language").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ex" | "exs" => Some(Language::Elixir),
            "py" | "pyw" => Some(Language::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Language::Javascript),
            "ts" => Some(Language::Typescript),
            "tsx" => Some(Language::Tsx),
            _ => None,
        }
    }

    /// Convenience wrapper over `from_extension` for a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Elixir => "elixir",
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Tsx => "tsx",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The normalized kind vocabulary for definition sites (§4.2's static table
/// maps grammar node kinds onto this enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Module,
    Method,
    Variable,
    Constant,
    Import,
    Alias,
    Use,
    Require,
    Macro,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Module => "module",
            SymbolKind::Method => "method",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Import => "import",
            SymbolKind::Alias => "alias",
            SymbolKind::Use => "use",
            SymbolKind::Require => "require",
            SymbolKind::Macro => "macro",
        }
    }

    /// Kinds that `find_definition`/`call_graph` treat as "a definition",
    /// per §4.6.
    pub fn is_definition_kind(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function
                | SymbolKind::Class
                | SymbolKind::Module
                | SymbolKind::Method
                | SymbolKind::Macro
        )
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Protected,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The normalized kind vocabulary for usage sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Call,
    QualifiedCall,
    Import,
    Alias,
    Use,
    Require,
    New,
    Extends,
    Implements,
    TypeReference,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Call => "call",
            ReferenceKind::QualifiedCall => "qualified_call",
            ReferenceKind::Import => "import",
            ReferenceKind::Alias => "alias",
            ReferenceKind::Use => "use",
            ReferenceKind::Require => "require",
            ReferenceKind::New => "new",
            ReferenceKind::Extends => "extends",
            ReferenceKind::Implements => "implements",
            ReferenceKind::TypeReference => "type_reference",
        }
    }

    /// Kinds that `call_graph` treats as a "call" edge.
    pub fn is_call_kind(&self) -> bool {
        matches!(self, ReferenceKind::Call | ReferenceKind::QualifiedCall)
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A definition site as produced by the Extractor, before the Store has
/// assigned it an id or resolved its parent to a real `SymbolId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSymbol {
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub language: Language,
    pub visibility: Visibility,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub signature: Option<String>,
    pub doc: Option<String>,
    pub metadata: serde_json::Value,
    /// Index of the enclosing symbol within the same extraction batch.
    pub parent: Option<usize>,
}

impl ExtractedSymbol {
    /// True when `other`'s range strictly contains `self`'s range.
    pub fn is_strictly_contained_by(&self, other: &ExtractedSymbol) -> bool {
        let starts_after = (other.start_line, other.start_col) < (self.start_line, self.start_col);
        let ends_before = (self.end_line, self.end_col) < (other.end_line, other.end_col);
        starts_after && ends_before
    }
}

/// A usage site as produced by the Extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedReference {
    pub name: String,
    pub qualified_name: Option<String>,
    pub kind: ReferenceKind,
    pub language: Language,
    pub line: u32,
    pub col: u32,
    pub end_line: Option<u32>,
    pub end_col: Option<u32>,
    pub target_module: Option<String>,
    pub metadata: serde_json::Value,
    /// Index of the innermost containing symbol within the same batch.
    pub container: Option<usize>,
}

/// A persisted definition site (§3 Symbol).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub file_path: String,
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub language: Language,
    pub visibility: Visibility,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub signature: Option<String>,
    pub doc: Option<String>,
    pub metadata: serde_json::Value,
    pub file_hash: String,
    pub indexed_at: chrono::DateTime<chrono::Utc>,
    pub parent: Option<SymbolId>,
}

/// A persisted usage site (§3 Reference).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: ReferenceId,
    pub file_path: String,
    pub name: String,
    pub qualified_name: String,
    pub kind: ReferenceKind,
    pub language: Language,
    pub line: u32,
    pub col: u32,
    pub end_line: Option<u32>,
    pub end_col: Option<u32>,
    pub target_module: Option<String>,
    pub metadata: serde_json::Value,
    pub file_hash: String,
    pub symbol_id: Option<SymbolId>,
    pub container_id: Option<SymbolId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping_matches_static_table() {
        assert_eq!(Language::from_extension("ex"), Some(Language::Elixir));
        assert_eq!(Language::from_extension("exs"), Some(Language::Elixir));
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("pyw"), Some(Language::Python));
        assert_eq!(Language::from_extension("js"), Some(Language::Javascript));
        assert_eq!(Language::from_extension("mjs"), Some(Language::Javascript));
        assert_eq!(Language::from_extension("jsx"), Some(Language::Javascript));
        assert_eq!(Language::from_extension("ts"), Some(Language::Typescript));
        assert_eq!(Language::from_extension("tsx"), Some(Language::Tsx));
        assert_eq!(Language::from_extension("rb"), None);
    }

    #[test]
    fn definition_kinds_exclude_non_definitions() {
        assert!(SymbolKind::Function.is_definition_kind());
        assert!(!SymbolKind::Variable.is_definition_kind());
        assert!(!SymbolKind::Import.is_definition_kind());
    }

    #[test]
    fn strict_containment_requires_both_bounds() {
        let outer = ExtractedSymbol {
            name: "Foo".into(),
            qualified_name: "Foo".into(),
            kind: SymbolKind::Module,
            language: Language::Elixir,
            visibility: Visibility::Public,
            start_line: 1,
            start_col: 0,
            end_line: 10,
            end_col: 3,
            signature: None,
            doc: None,
            metadata: serde_json::Value::Null,
            parent: None,
        };
        let inner = ExtractedSymbol {
            start_line: 2,
            start_col: 2,
            end_line: 4,
            end_col: 5,
            ..outer.clone()
        };
        assert!(inner.is_strictly_contained_by(&outer));
        assert!(!outer.is_strictly_contained_by(&inner));
        assert!(!outer.is_strictly_contained_by(&outer));
    }
}
