//! The word store and batch store collaborators.
//!
//! The engine only relies on the operations below: point lookup by full form,
//! insert/update, and a filtered scan over the searchable projections of a
//! word entry. `memory` provides the in-process implementations used by the
//! CLI and the tests.

pub mod memory;

use crate::core::types::{Batch, BatchId, BatchRecord, RecordId, WordEntry, WordId};
use crate::error::Result;

pub use memory::{MemoryBatchStore, MemoryWordStore};

/// Predicates for a word store scan. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub syllable_count: Option<usize>,
    /// Delimiter-joined phonemes that must occur as whole phonemes.
    pub phoneme_run: Option<String>,
    pub surface_suffix: Option<String>,
    /// Literals that must each occur somewhere in the bare form.
    pub bare_contains_all: Vec<String>,
    pub approved: Option<bool>,
    /// Scan from the most recently inserted entry backwards.
    pub newest_first: bool,
}

impl ScanFilter {
    pub fn matches(&self, entry: &WordEntry) -> bool {
        if self.syllable_count.is_some_and(|n| entry.syllable_count() != n) {
            return false;
        }
        if self.approved.is_some_and(|a| entry.approved != a) {
            return false;
        }
        if let Some(run) = &self.phoneme_run {
            if !entry.contains_phoneme_run(run) {
                return false;
            }
        }
        if let Some(suffix) = &self.surface_suffix {
            if !entry.surface_form().ends_with(suffix.as_str()) {
                return false;
            }
        }
        self.bare_contains_all
            .iter()
            .all(|literal| entry.bare_form().contains(literal.as_str()))
    }
}

pub trait WordStore: Send + Sync {
    fn get(&self, id: WordId) -> Option<WordEntry>;

    fn find_by_full_form(&self, full_form: &str) -> Option<WordEntry>;

    /// Persists a new entry and returns its id. `full_form` must be unique.
    fn insert(&self, entry: WordEntry) -> Result<WordId>;

    /// Replaces a stored entry (matched by id).
    fn update(&self, entry: &WordEntry) -> Result<()>;

    fn remove(&self, id: WordId) -> Result<WordEntry>;

    /// Entries matching `filter`, skipping `offset` matches and returning at most `limit`.
    fn scan(&self, filter: &ScanFilter, offset: usize, limit: usize) -> Vec<WordEntry>;

    fn count(&self, filter: &ScanFilter) -> usize;

    /// Single-word entries whose bare or full form starts with `prefix`.
    fn suggest(&self, prefix: &str, limit: usize) -> Vec<WordEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One row a bulk insert could not store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub row_index: usize,
    pub reason: String,
}

/// Result of an unordered bulk insert: every row is attempted independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkInsertOutcome {
    pub inserted: usize,
    pub failures: Vec<RowFailure>,
}

impl BulkInsertOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

pub trait BatchStore: Send + Sync {
    fn create_batch(&self, file_name: &str) -> Batch;

    fn batch(&self, id: BatchId) -> Option<Batch>;

    fn update_batch(&self, batch: &Batch) -> Result<()>;

    /// Deletes the batch and all of its records, returning how many records went with it.
    fn delete_batch(&self, id: BatchId) -> Result<usize>;

    fn insert_records(&self, batch: BatchId, records: Vec<BatchRecord>) -> BulkInsertOutcome;

    fn insert_record(&self, batch: BatchId, record: BatchRecord) -> Result<RecordId>;

    fn record(&self, id: RecordId) -> Option<BatchRecord>;

    /// All records of a batch ordered by `row_index`.
    fn records(&self, batch: BatchId) -> Vec<BatchRecord>;

    fn update_record(&self, record: &BatchRecord) -> Result<()>;

    fn max_row_index(&self, batch: BatchId) -> usize;

    /// Whether the batch already holds a record for exactly this word text.
    fn has_record_text(&self, batch: BatchId, text: &str) -> bool;
}
