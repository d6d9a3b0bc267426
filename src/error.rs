//! Error types for rhyme queries, ingestion bookkeeping and persistence.

use crate::core::types::{BatchId, RecordId, WordId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the engine's entry points.
///
/// Analysis never fails; malformed words degrade to a whole-word result.
/// Per-record ingestion problems are written onto the record instead of
/// being returned.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The rhyme anchor is not in the word store.
    #[error("Anchor word {0} not found")]
    AnchorNotFound(WordId),

    /// A rhyme length below the minimum was requested.
    #[error("Invalid rhyme length {requested}: must be at least {minimum}")]
    InvalidLength { requested: usize, minimum: usize },

    #[error("Batch {0} not found")]
    BatchNotFound(BatchId),

    #[error("Batch record {0} not found")]
    RecordNotFound(RecordId),

    #[error("Word {0} not found")]
    WordNotFound(WordId),

    /// `full_form` is the unique key of the word store.
    #[error("Word '{0}' already exists")]
    DuplicateWord(String),

    #[error("Word '{0}' has not been saved yet")]
    UnsavedWord(String),

    #[error("Row {row_index} already exists in batch {batch}")]
    DuplicateRow { batch: BatchId, row_index: usize },

    #[error("CSV line {line}: {reason}")]
    Csv { line: usize, reason: String },

    #[error("Invalid config at {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
