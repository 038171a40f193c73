//! Error taxonomy for the Watcher (§7): a subscription failure at
//! startup degrades to passive tracking rather than erroring; only a bad
//! argument to `watch` is reported to the caller.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}
