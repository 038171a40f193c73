//! Error taxonomy for persistence and querying.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("unknown symbol kind in store row: {0}")]
    UnknownSymbolKind(String),

    #[error("unknown reference kind in store row: {0}")]
    UnknownReferenceKind(String),

    #[error("unknown language in store row: {0}")]
    UnknownLanguage(String),

    #[error("unknown visibility in store row: {0}")]
    UnknownVisibility(String),
}
