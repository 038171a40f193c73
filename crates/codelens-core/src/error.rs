//! Error taxonomy for parsing and extraction.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unsupported language for {0}")]
    UnsupportedLanguage(PathBuf),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file is empty: {0}")]
    EmptyFile(PathBuf),

    #[error("parser error: {0}")]
    ParserError(String),

    #[error("query error: {0}")]
    QueryError(String),
}

impl ParseError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ParseError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
