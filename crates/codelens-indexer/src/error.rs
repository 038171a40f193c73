//! Error taxonomy for the indexing pipeline (§7): input errors and parse
//! errors short-circuit a single file without touching the store; store
//! errors propagate the transaction's rollback.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("unknown language for {0}")]
    UnknownLanguage(PathBuf),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] codelens_core::ParseError),

    #[error("store error: {0}")]
    Store(#[from] codelens_store::StoreError),

    #[error("indexing {0} exceeded the per-file timeout")]
    Timeout(PathBuf),

    #[error("indexing task for {0} panicked or was cancelled: {1}")]
    Join(PathBuf, String),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}
