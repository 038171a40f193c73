//! Row <-> domain-model conversions. Kept separate from `query.rs` since
//! both `store.rs` (writing) and `query.rs` (reading) need the same enum
//! string mapping.

use crate::error::{Result, StoreError};
use codelens_core::{Language, ReferenceKind, SymbolKind, Visibility};
use rusqlite::Row;

pub fn language_from_str(s: &str) -> Result<Language> {
    match s {
        "elixir" => Ok(Language::Elixir),
        "python" => Ok(Language::Python),
        "javascript" => Ok(Language::Javascript),
        "typescript" => Ok(Language::Typescript),
        "tsx" => Ok(Language::Tsx),
        other => Err(StoreError::UnknownLanguage(other.to_string())),
    }
}

pub fn symbol_kind_from_str(s: &str) -> Result<SymbolKind> {
    Ok(match s {
        "function" => SymbolKind::Function,
        "class" => SymbolKind::Class,
        "module" => SymbolKind::Module,
        "method" => SymbolKind::Method,
        "variable" => SymbolKind::Variable,
        "constant" => SymbolKind::Constant,
        "import" => SymbolKind::Import,
        "alias" => SymbolKind::Alias,
        "use" => SymbolKind::Use,
        "require" => SymbolKind::Require,
        "macro" => SymbolKind::Macro,
        other => return Err(StoreError::UnknownSymbolKind(other.to_string())),
    })
}

pub fn visibility_from_str(s: &str) -> Result<Visibility> {
    Ok(match s {
        "public" => Visibility::Public,
        "private" => Visibility::Private,
        "protected" => Visibility::Protected,
        other => return Err(StoreError::UnknownVisibility(other.to_string())),
    })
}

pub fn reference_kind_from_str(s: &str) -> Result<ReferenceKind> {
    Ok(match s {
        "call" => ReferenceKind::Call,
        "qualified_call" => ReferenceKind::QualifiedCall,
        "import" => ReferenceKind::Import,
        "alias" => ReferenceKind::Alias,
        "use" => ReferenceKind::Use,
        "require" => ReferenceKind::Require,
        "new" => ReferenceKind::New,
        "extends" => ReferenceKind::Extends,
        "implements" => ReferenceKind::Implements,
        "type_reference" => ReferenceKind::TypeReference,
        other => return Err(StoreError::UnknownReferenceKind(other.to_string())),
    })
}

pub fn symbol_from_row(row: &Row) -> rusqlite::Result<codelens_core::Symbol> {
    let kind: String = row.get("kind")?;
    let language: String = row.get("language")?;
    let visibility: String = row.get("visibility")?;
    let metadata: String = row.get("metadata")?;
    let indexed_at: String = row.get("indexed_at")?;
    let parent_id: Option<i64> = row.get("parent_id")?;

    Ok(codelens_core::Symbol {
        id: codelens_core::SymbolId(row.get("id")?),
        file_path: row.get("file_path")?,
        name: row.get("name")?,
        qualified_name: row.get("qualified_name")?,
        kind: symbol_kind_from_str(&kind).map_err(sqlite_err)?,
        language: language_from_str(&language).map_err(sqlite_err)?,
        visibility: visibility_from_str(&visibility).map_err(sqlite_err)?,
        start_line: row.get::<_, i64>("start_line")? as u32,
        start_col: row.get::<_, i64>("start_col")? as u32,
        end_line: row.get::<_, i64>("end_line")? as u32,
        end_col: row.get::<_, i64>("end_col")? as u32,
        signature: row.get("signature")?,
        doc: row.get("doc")?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        file_hash: row.get("file_hash")?,
        indexed_at: indexed_at
            .parse()
            .unwrap_or_else(|_| chrono::Utc::now()),
        parent: parent_id.map(codelens_core::SymbolId),
    })
}

pub fn reference_from_row(row: &Row) -> rusqlite::Result<codelens_core::Reference> {
    let kind: String = row.get("kind")?;
    let language: String = row.get("language")?;
    let metadata: String = row.get("metadata")?;
    let symbol_id: Option<i64> = row.get("symbol_id")?;
    let container_id: Option<i64> = row.get("container_id")?;

    Ok(codelens_core::Reference {
        id: codelens_core::ReferenceId(row.get("id")?),
        file_path: row.get("file_path")?,
        name: row.get("name")?,
        qualified_name: row.get("qualified_name")?,
        kind: reference_kind_from_str(&kind).map_err(sqlite_err)?,
        language: language_from_str(&language).map_err(sqlite_err)?,
        line: row.get::<_, i64>("line")? as u32,
        col: row.get::<_, i64>("col")? as u32,
        end_line: row.get::<_, Option<i64>>("end_line")?.map(|v| v as u32),
        end_col: row.get::<_, Option<i64>>("end_col")?.map(|v| v as u32),
        target_module: row.get("target_module")?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        file_hash: row.get("file_hash")?,
        symbol_id: symbol_id.map(codelens_core::SymbolId),
        container_id: container_id.map(codelens_core::SymbolId),
    })
}

fn sqlite_err(e: StoreError) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(0, e.to_string(), rusqlite::types::Type::Text)
}
