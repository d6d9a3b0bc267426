// --- File: src/store/memory.rs
use crate::core::script::ZWNJ;
use crate::core::trie::PrefixIndex;
use crate::core::types::{Batch, BatchId, BatchRecord, RecordId, WordEntry, WordId};
use crate::error::{EngineError, Result};
use crate::store::{BatchStore, BulkInsertOutcome, RowFailure, ScanFilter, WordStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The serializable contents of a [`MemoryWordStore`].
///
/// `entries` is indexed by `WordId`; removed words leave a `None` slot so
/// ids are never reused.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WordTable {
    entries: Vec<Option<WordEntry>>,
    by_full_form: HashMap<String, WordId>,
    prefixes: PrefixIndex,
}

impl WordTable {
    fn live(&self) -> impl DoubleEndedIterator<Item = &WordEntry> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    fn index_prefixes(&mut self, entry: &WordEntry, id: WordId) {
        if is_single_word(entry.full_form()) {
            self.prefixes.insert(entry.bare_form(), id);
            self.prefixes.insert(entry.full_form(), id);
        }
    }

    fn unindex_prefixes(&mut self, entry: &WordEntry, id: WordId) {
        self.prefixes.remove(entry.bare_form(), id);
        self.prefixes.remove(entry.full_form(), id);
    }
}

fn is_single_word(text: &str) -> bool {
    !text.chars().any(|c| c == ZWNJ || c.is_whitespace())
}

/// An in-process word store guarded by a single reader/writer lock.
#[derive(Default)]
pub struct MemoryWordStore {
    table: RwLock<WordTable>,
}

impl MemoryWordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: WordTable) -> Self {
        Self { table: RwLock::new(table) }
    }

    /// A consistent copy of the whole store, for persistence.
    pub fn snapshot(&self) -> WordTable {
        self.table.read().clone()
    }
}

impl WordStore for MemoryWordStore {
    fn get(&self, id: WordId) -> Option<WordEntry> {
        self.table.read().entries.get(id).cloned().flatten()
    }

    fn find_by_full_form(&self, full_form: &str) -> Option<WordEntry> {
        let table = self.table.read();
        let id = *table.by_full_form.get(full_form)?;
        table.entries.get(id).cloned().flatten()
    }

    fn insert(&self, mut entry: WordEntry) -> Result<WordId> {
        let mut table = self.table.write();
        if table.by_full_form.contains_key(entry.full_form()) {
            return Err(EngineError::DuplicateWord(entry.full_form().to_string()));
        }
        let id = table.entries.len();
        entry.assign_id(id);
        table.by_full_form.insert(entry.full_form().to_string(), id);
        table.index_prefixes(&entry, id);
        table.entries.push(Some(entry));
        Ok(id)
    }

    fn update(&self, entry: &WordEntry) -> Result<()> {
        let id = entry
            .id()
            .ok_or_else(|| EngineError::UnsavedWord(entry.full_form().to_string()))?;
        let mut table = self.table.write();
        let previous = table
            .entries
            .get(id)
            .cloned()
            .flatten()
            .ok_or(EngineError::WordNotFound(id))?;

        if previous.full_form() != entry.full_form() {
            if table.by_full_form.contains_key(entry.full_form()) {
                return Err(EngineError::DuplicateWord(entry.full_form().to_string()));
            }
            table.by_full_form.remove(previous.full_form());
            table.by_full_form.insert(entry.full_form().to_string(), id);
        }
        table.unindex_prefixes(&previous, id);
        table.index_prefixes(entry, id);
        table.entries[id] = Some(entry.clone());
        Ok(())
    }

    fn remove(&self, id: WordId) -> Result<WordEntry> {
        let mut table = self.table.write();
        let entry = table
            .entries
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(EngineError::WordNotFound(id))?;
        table.by_full_form.remove(entry.full_form());
        table.unindex_prefixes(&entry, id);
        Ok(entry)
    }

    fn scan(&self, filter: &ScanFilter, offset: usize, limit: usize) -> Vec<WordEntry> {
        let table = self.table.read();
        let matching = |entry: &&WordEntry| filter.matches(entry);
        let found: Vec<WordEntry> = if filter.newest_first {
            table.live().rev().filter(matching).skip(offset).take(limit).cloned().collect()
        } else {
            table.live().filter(matching).skip(offset).take(limit).cloned().collect()
        };
        found
    }

    fn count(&self, filter: &ScanFilter) -> usize {
        self.table.read().live().filter(|entry| filter.matches(entry)).count()
    }

    fn suggest(&self, prefix: &str, limit: usize) -> Vec<WordEntry> {
        if prefix.is_empty() || limit == 0 {
            return Vec::new();
        }
        let table = self.table.read();
        // Each word is indexed under two keys, so over-collect before de-duplicating.
        let mut ids = table.prefixes.with_prefix(prefix, limit.saturating_mul(2));
        let mut seen = Vec::with_capacity(ids.len());
        ids.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(*id);
                true
            }
        });
        let found: Vec<WordEntry> = ids
            .into_iter()
            .filter_map(|id| table.entries.get(id).cloned().flatten())
            .take(limit)
            .collect();
        found
    }

    fn len(&self) -> usize {
        self.table.read().by_full_form.len()
    }
}

/// The serializable contents of a [`MemoryBatchStore`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BatchTable {
    batches: BTreeMap<BatchId, Batch>,
    records: BTreeMap<RecordId, BatchRecord>,
    by_row: BTreeMap<(BatchId, usize), RecordId>,
    next_batch_id: BatchId,
    next_record_id: RecordId,
}

impl BatchTable {
    fn row_ids(&self, batch: BatchId) -> impl Iterator<Item = RecordId> + '_ {
        self.by_row
            .range((batch, 0)..=(batch, usize::MAX))
            .map(|(_, &id)| id)
    }

    fn store_record(&mut self, batch: BatchId, mut record: BatchRecord) -> Result<RecordId> {
        if !self.batches.contains_key(&batch) {
            return Err(EngineError::BatchNotFound(batch));
        }
        let key = (batch, record.row_index);
        if self.by_row.contains_key(&key) {
            return Err(EngineError::DuplicateRow { batch, row_index: record.row_index });
        }
        self.next_record_id += 1;
        let id = self.next_record_id;
        record.id = id;
        record.batch = batch;
        self.by_row.insert(key, id);
        self.records.insert(id, record);
        Ok(id)
    }
}

/// Batches and their records, with `(batch, row_index)` kept unique.
#[derive(Default)]
pub struct MemoryBatchStore {
    table: RwLock<BatchTable>,
}

impl MemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: BatchTable) -> Self {
        Self { table: RwLock::new(table) }
    }

    pub fn snapshot(&self) -> BatchTable {
        self.table.read().clone()
    }
}

impl BatchStore for MemoryBatchStore {
    fn create_batch(&self, file_name: &str) -> Batch {
        let mut table = self.table.write();
        table.next_batch_id += 1;
        let batch = Batch::new(table.next_batch_id, file_name);
        table.batches.insert(batch.id, batch.clone());
        batch
    }

    fn batch(&self, id: BatchId) -> Option<Batch> {
        self.table.read().batches.get(&id).cloned()
    }

    fn update_batch(&self, batch: &Batch) -> Result<()> {
        let mut table = self.table.write();
        let slot = table
            .batches
            .get_mut(&batch.id)
            .ok_or(EngineError::BatchNotFound(batch.id))?;
        *slot = batch.clone();
        Ok(())
    }

    fn delete_batch(&self, id: BatchId) -> Result<usize> {
        let mut table = self.table.write();
        table.batches.remove(&id).ok_or(EngineError::BatchNotFound(id))?;
        let doomed: Vec<(usize, RecordId)> = table
            .by_row
            .range((id, 0)..=(id, usize::MAX))
            .map(|(&(_, row), &record)| (row, record))
            .collect();
        for (row, record) in &doomed {
            table.by_row.remove(&(id, *row));
            table.records.remove(record);
        }
        Ok(doomed.len())
    }

    fn insert_records(&self, batch: BatchId, records: Vec<BatchRecord>) -> BulkInsertOutcome {
        let mut table = self.table.write();
        let mut outcome = BulkInsertOutcome::default();
        for record in records {
            let row_index = record.row_index;
            match table.store_record(batch, record) {
                Ok(_) => outcome.inserted += 1,
                Err(e) => outcome.failures.push(RowFailure { row_index, reason: e.to_string() }),
            }
        }
        outcome
    }

    fn insert_record(&self, batch: BatchId, record: BatchRecord) -> Result<RecordId> {
        self.table.write().store_record(batch, record)
    }

    fn record(&self, id: RecordId) -> Option<BatchRecord> {
        self.table.read().records.get(&id).cloned()
    }

    fn records(&self, batch: BatchId) -> Vec<BatchRecord> {
        let table = self.table.read();
        let records: Vec<BatchRecord> = table
            .row_ids(batch)
            .filter_map(|id| table.records.get(&id).cloned())
            .collect();
        records
    }

    fn update_record(&self, record: &BatchRecord) -> Result<()> {
        let mut table = self.table.write();
        let slot = table
            .records
            .get_mut(&record.id)
            .ok_or(EngineError::RecordNotFound(record.id))?;
        if slot.batch != record.batch || slot.row_index != record.row_index {
            return Err(EngineError::RecordNotFound(record.id));
        }
        *slot = record.clone();
        Ok(())
    }

    fn max_row_index(&self, batch: BatchId) -> usize {
        self.table
            .read()
            .by_row
            .range((batch, 0)..=(batch, usize::MAX))
            .next_back()
            .map(|(&(_, row), _)| row)
            .unwrap_or(0)
    }

    fn has_record_text(&self, batch: BatchId, text: &str) -> bool {
        let table = self.table.read();
        let found = table.row_ids(batch).any(|id| {
            table
                .records
                .get(&id)
                .is_some_and(|r| r.annotated_grapheme == text || r.raw_grapheme == text)
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(full: &str) -> WordEntry {
        WordEntry::new(full, vec![full.to_string()], vec![full.to_string()])
    }

    #[test]
    fn full_form_is_unique() {
        let store = MemoryWordStore::new();
        let id = store.insert(word("سَر")).unwrap();
        assert_eq!(store.get(id).unwrap().id(), Some(id));
        assert!(matches!(store.insert(word("سَر")), Err(EngineError::DuplicateWord(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_and_remove_keep_indexes_consistent() {
        let store = MemoryWordStore::new();
        let id = store.insert(word("سَرد")).unwrap();

        let mut entry = store.get(id).unwrap();
        entry.approved = true;
        store.update(&entry).unwrap();
        assert!(store.find_by_full_form("سَرد").unwrap().approved);

        store.remove(id).unwrap();
        assert!(store.find_by_full_form("سَرد").is_none());
        assert!(store.suggest("سر", 10).is_empty());
        assert!(matches!(store.remove(id), Err(EngineError::WordNotFound(_))));
    }

    #[test]
    fn suggest_skips_compounds_and_matches_bare_prefix() {
        let store = MemoryWordStore::new();
        store.insert(word("سَرد")).unwrap();
        store.insert(word("سَرو")).unwrap();
        store.insert(word("سَر کار")).unwrap();
        store.insert(word("باد")).unwrap();

        let found: Vec<String> = store
            .suggest("سر", 10)
            .iter()
            .map(|e| e.full_form().to_string())
            .collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&"سَرد".to_string()));
        assert!(found.contains(&"سَرو".to_string()));
        assert_eq!(store.suggest("سر", 1).len(), 1);
    }

    #[test]
    fn scan_pages_in_both_directions() {
        let store = MemoryWordStore::new();
        for w in ["الف", "ب", "پ", "ت"] {
            store.insert(word(w)).unwrap();
        }
        let filter = ScanFilter::default();
        let oldest: Vec<_> = store.scan(&filter, 1, 2).into_iter().map(|e| e.id()).collect();
        assert_eq!(oldest, vec![Some(1), Some(2)]);

        let newest = ScanFilter { newest_first: true, ..ScanFilter::default() };
        let ids: Vec<_> = store.scan(&newest, 0, 2).into_iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![Some(3), Some(2)]);
        assert_eq!(store.count(&filter), 4);
    }

    #[test]
    fn bulk_insert_counts_duplicate_rows_as_failures() {
        let store = MemoryBatchStore::new();
        let batch = store.create_batch("words.csv");
        let outcome = store.insert_records(
            batch.id,
            vec![
                BatchRecord::new("سر", "سَر", 1),
                BatchRecord::new("در", "دَر", 2),
                BatchRecord::new("بر", "بَر", 2),
            ],
        );
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures[0].row_index, 2);
        assert_eq!(store.max_row_index(batch.id), 2);
        assert!(store.has_record_text(batch.id, "دَر"));
        assert!(!store.has_record_text(batch.id, "بَر"));
    }

    #[test]
    fn records_come_back_in_row_order() {
        let store = MemoryBatchStore::new();
        let batch = store.create_batch("words.csv");
        store.insert_record(batch.id, BatchRecord::new("ب", "ب", 3)).unwrap();
        store.insert_record(batch.id, BatchRecord::new("الف", "الف", 1)).unwrap();
        let rows: Vec<usize> = store.records(batch.id).iter().map(|r| r.row_index).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn deleting_a_batch_cascades_to_records() {
        let store = MemoryBatchStore::new();
        let keep = store.create_batch("a.csv");
        let drop = store.create_batch("b.csv");
        store.insert_record(keep.id, BatchRecord::new("سر", "سر", 1)).unwrap();
        store.insert_record(drop.id, BatchRecord::new("در", "در", 1)).unwrap();
        store.insert_record(drop.id, BatchRecord::new("بر", "بر", 2)).unwrap();

        assert_eq!(store.delete_batch(drop.id).unwrap(), 2);
        assert!(store.batch(drop.id).is_none());
        assert!(store.records(drop.id).is_empty());
        assert_eq!(store.records(keep.id).len(), 1);
        assert!(matches!(store.delete_batch(drop.id), Err(EngineError::BatchNotFound(_))));
    }

    #[test]
    fn records_need_an_existing_batch() {
        let store = MemoryBatchStore::new();
        assert!(matches!(
            store.insert_record(42, BatchRecord::new("سر", "سر", 1)),
            Err(EngineError::BatchNotFound(42))
        ));
    }
}
