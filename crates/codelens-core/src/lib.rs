//! Tree-sitter parser bridge and symbol/reference extraction.
//!
//! This crate owns parsing and extraction only (§4.1/§4.2/§4.3): it knows
//! how to turn source bytes into `ExtractedSymbol`/`ExtractedReference`
//! lists plus a content hash, and nothing about where those end up.
//! Persistence lives in `codelens-store`; orchestration in
//! `codelens-indexer`.

pub mod bridge;
pub mod error;
pub mod extractor;
pub mod hash;
pub mod model;

pub use bridge::{Edit, ParsedTree, ParserBridge, QueryMatch};
pub use error::{ParseError, Result};
pub use model::{
    ExtractedReference, ExtractedSymbol, Language, Reference, ReferenceId, ReferenceKind, Symbol,
    SymbolId, SymbolKind, Visibility,
};
