// File: src/core/engine.rs
use crate::config::EngineConfig;
use crate::core::analyzer::Analysis;
use crate::core::types::{Batch, BatchId, BatchRecord, OrthographyHints, WordEntry, WordId};
use crate::error::{EngineError, Result};
use crate::ingest::{IngestPipeline, IngestReport};
use crate::persistence::{load_from_disk, save_to_disk};
use crate::resolver::{Resolution, ResolveMode, WordResolver};
use crate::rhyme::{Page, PageInfo, RhymeMatcher, RhymePage, RhymeQuery};
use crate::store::{BatchStore, MemoryBatchStore, MemoryWordStore, ScanFilter, WordStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Entry point tying the analyzer, the stores, the rhyme matcher and the
/// ingestion pipeline together. Cloning is cheap and shares the stores.
pub struct RhymeEngine<W = MemoryWordStore, B = MemoryBatchStore> {
    words: Arc<W>,
    batches: Arc<B>,
    resolver: WordResolver,
    matcher: RhymeMatcher,
    pipeline: IngestPipeline,
    config: EngineConfig,
}

impl<W, B> Clone for RhymeEngine<W, B> {
    fn clone(&self) -> Self {
        Self {
            words: Arc::clone(&self.words),
            batches: Arc::clone(&self.batches),
            resolver: self.resolver.clone(),
            matcher: self.matcher.clone(),
            pipeline: self.pipeline.clone(),
            config: self.config.clone(),
        }
    }
}

impl RhymeEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_stores(
            Arc::new(MemoryWordStore::new()),
            Arc::new(MemoryBatchStore::new()),
            config,
        )
    }

    /// Restores the stores from `config.snapshot_path`, starting empty when
    /// there is no snapshot yet or it cannot be read.
    pub fn open(config: EngineConfig) -> Self {
        let Some(path) = config.snapshot_path.clone() else {
            return Self::with_config(config);
        };
        match load_from_disk(&path) {
            Ok((words, batches)) => {
                info!(path = %path.display(), words = words.len(), "snapshot loaded");
                Self::with_stores(Arc::new(words), Arc::new(batches), config)
            }
            Err(EngineError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::with_config(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot unreadable, starting empty");
                Self::with_config(config)
            }
        }
    }

    /// Writes the stores to the configured snapshot path, if any.
    pub fn save(&self) -> Result<()> {
        match &self.config.snapshot_path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        save_to_disk(&self.words, &self.batches, path)
    }
}

impl Default for RhymeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl<W, B> RhymeEngine<W, B>
where
    W: WordStore + 'static,
    B: BatchStore + 'static,
{
    pub fn with_stores(words: Arc<W>, batches: Arc<B>, config: EngineConfig) -> Self {
        Self {
            words,
            batches,
            resolver: WordResolver::new(),
            matcher: RhymeMatcher::new(config.rhyme.clone()),
            pipeline: IngestPipeline::new(config.ingest.chunk_size),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn words(&self) -> &W {
        &self.words
    }

    pub fn batches(&self) -> &B {
        &self.batches
    }

    // --- Analysis -----------------------------------------------------------

    pub fn analyze(&self, text: &str) -> Analysis {
        self.resolver.analyzer().analyze(text)
    }

    pub fn normalize(&self, word: &str, hints: &OrthographyHints) -> String {
        self.resolver.normalizer().normalize(word, hints)
    }

    /// Resolves `text` against the store. A compound made only of known
    /// words is stored as a new entry.
    pub fn resolve(&self, text: &str, hints: Option<&OrthographyHints>) -> Result<Resolution> {
        self.resolver
            .resolve(self.words.as_ref(), text, hints, ResolveMode::default())
    }

    /// Stores the unsaved parts of a resolution and the resolution itself.
    pub fn confirm(&self, resolution: &Resolution) -> Result<WordId> {
        self.resolver.confirm(self.words.as_ref(), resolution)
    }

    // --- Rhymes -------------------------------------------------------------

    pub fn find_rhymes(&self, query: &RhymeQuery) -> Result<RhymePage> {
        self.matcher.find_rhymes(self.words.as_ref(), query)
    }

    pub fn viable_rhyme_lengths(&self, anchor: WordId, letters: &str) -> Result<Vec<usize>> {
        self.matcher
            .viable_lengths(self.words.as_ref(), anchor, letters, false)
    }

    // --- Word store management ----------------------------------------------

    pub fn word(&self, id: WordId) -> Option<WordEntry> {
        self.words.get(id)
    }

    pub fn find_word(&self, full_form: &str) -> Option<WordEntry> {
        self.words.find_by_full_form(full_form)
    }

    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<WordEntry> {
        let limit = if limit == 0 { self.config.rhyme.default_limit } else { limit };
        self.words.suggest(prefix, limit)
    }

    pub fn set_approved(&self, id: WordId, approved: bool) -> Result<WordEntry> {
        self.modify_word(id, |entry| entry.approved = approved)
    }

    pub fn set_rejected(&self, id: WordId, rejected: bool) -> Result<WordEntry> {
        self.modify_word(id, |entry| entry.rejected = rejected)
    }

    /// Replaces a stored word's form and analysis, keeping its id and review
    /// flags. Fails with `DuplicateWord` when another entry already holds
    /// `full_form`.
    pub fn update_word(
        &self,
        id: WordId,
        full_form: &str,
        syllables: Vec<String>,
        phonemes: Vec<String>,
    ) -> Result<WordEntry> {
        let current = self.words.get(id).ok_or(EngineError::WordNotFound(id))?;
        let full_form = full_form.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut entry = if current.full_form() == full_form {
            current
        } else {
            // Space and soft-compound offsets follow the new form.
            let mut rebuilt = WordEntry::new(&full_form, Vec::new(), Vec::new());
            rebuilt.assign_id(id);
            rebuilt.approved = current.approved;
            rebuilt.rejected = current.rejected;
            rebuilt
        };
        entry.set_analysis(syllables, phonemes);
        self.words.update(&entry)?;
        info!(id, full_form = entry.full_form(), "word updated");
        Ok(entry)
    }

    pub fn delete_word(&self, id: WordId) -> Result<WordEntry> {
        self.words.remove(id)
    }

    /// Newest words first, optionally narrowed by approval and a bare-form substring.
    pub fn list_words(
        &self,
        approved: Option<bool>,
        search: &str,
        page: usize,
        limit: usize,
    ) -> Page<WordEntry> {
        let search = search.trim();
        let filter = ScanFilter {
            approved,
            bare_contains_all: if search.is_empty() { Vec::new() } else { vec![search.to_string()] },
            newest_first: true,
            ..ScanFilter::default()
        };
        let limit = if limit == 0 { self.config.rhyme.default_limit } else { limit };
        let total = self.words.count(&filter);
        let info = PageInfo::new(page, limit, total);
        let items = self.words.scan(&filter, info.offset(), limit);
        Page { items, info }
    }

    fn modify_word(&self, id: WordId, change: impl FnOnce(&mut WordEntry)) -> Result<WordEntry> {
        let mut entry = self.words.get(id).ok_or(EngineError::WordNotFound(id))?;
        change(&mut entry);
        self.words.update(&entry)?;
        Ok(entry)
    }

    // --- Batches ------------------------------------------------------------

    pub fn create_batch(&self, file_name: &str) -> Batch {
        self.batches.create_batch(file_name)
    }

    pub fn batch(&self, id: BatchId) -> Option<Batch> {
        self.batches.batch(id)
    }

    /// Creates a batch and loads `path` into it on the calling thread.
    pub fn upload(&self, file_name: &str, path: &Path) -> Result<Batch> {
        let batch = self.batches.create_batch(file_name);
        self.pipeline.load_file(self.batches.as_ref(), batch.id, path)
    }

    /// Creates a batch and loads `path` on a detached thread. Poll
    /// [`RhymeEngine::batch`] for progress.
    pub fn upload_in_background(&self, file_name: &str, path: PathBuf) -> (BatchId, JoinHandle<Result<Batch>>) {
        let batch = self.batches.create_batch(file_name);
        let batch_id = batch.id;
        let batches = Arc::clone(&self.batches);
        let pipeline = self.pipeline.clone();
        let handle = thread::spawn(move || pipeline.load_file(batches.as_ref(), batch_id, &path));
        (batch_id, handle)
    }

    pub fn delete_batch(&self, id: BatchId) -> Result<usize> {
        let removed = self.batches.delete_batch(id)?;
        info!(batch = id, records = removed, "batch deleted");
        Ok(removed)
    }

    pub fn ingest(&self, batch_id: BatchId) -> Result<IngestReport> {
        self.pipeline
            .ingest(self.words.as_ref(), self.batches.as_ref(), batch_id)
    }

    pub fn reprocess(&self, batch_id: BatchId) -> Result<IngestReport> {
        self.pipeline
            .reprocess(self.words.as_ref(), self.batches.as_ref(), batch_id)
    }

    pub fn get_records(&self, batch_id: BatchId) -> Result<Vec<BatchRecord>> {
        if self.batches.batch(batch_id).is_none() {
            return Err(EngineError::BatchNotFound(batch_id));
        }
        Ok(self.batches.records(batch_id))
    }

    pub fn publish(&self, batch_id: BatchId) -> Result<usize> {
        self.pipeline
            .publish(self.words.as_ref(), self.batches.as_ref(), batch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BatchStatus;
    use std::io::Write;

    #[test]
    fn word_management_round_trip() {
        let engine = RhymeEngine::new();
        let resolution = engine.resolve("کاسِه", None).unwrap();
        let id = engine.confirm(&resolution).unwrap();

        assert!(engine.set_approved(id, true).unwrap().approved);
        assert!(engine.word(id).unwrap().approved);
        assert_eq!(engine.suggest("کاس", 0).len(), 1);

        let approved = engine.list_words(Some(true), "", 1, 10);
        assert_eq!(approved.info.total_items, 1);
        assert!(engine.list_words(Some(false), "", 1, 10).items.is_empty());

        engine.delete_word(id).unwrap();
        assert!(matches!(engine.set_rejected(id, true), Err(EngineError::WordNotFound(_))));
    }

    #[test]
    fn update_word_rewrites_form_and_analysis() {
        let engine = RhymeEngine::new();
        let id = engine.confirm(&engine.resolve("کاسِه", None).unwrap()).unwrap();
        let other = engine.confirm(&engine.resolve("پارِه", None).unwrap()).unwrap();
        engine.set_approved(id, true).unwrap();

        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let updated = engine
            .update_word(id, "کاسِه\u{200c}ها", strings(&["کا", "سِه", "ها"]), strings(&["آ", "اِ", "آ"]))
            .unwrap();
        assert_eq!(updated.id(), Some(id));
        assert!(updated.approved);
        assert_eq!(updated.syllable_count(), 3);
        assert_eq!(updated.phoneme_string(), "آ,اِ,آ");
        assert!(updated.soft_compound_offsets().contains(&5));

        assert!(engine.find_word("کاسِه").is_none());
        assert_eq!(engine.find_word("کاسِه\u{200c}ها").and_then(|e| e.id()), Some(id));

        // Same form, new analysis.
        let reanalyzed = engine
            .update_word(id, "کاسِه\u{200c}ها", strings(&["کا", "سِها"]), strings(&["آ", "اِ"]))
            .unwrap();
        assert_eq!(reanalyzed.syllable_count(), 2);
        assert_eq!(engine.word(id).unwrap().phoneme_string(), "آ,اِ");

        assert!(matches!(
            engine.update_word(other, "کاسِه\u{200c}ها", Vec::new(), Vec::new()),
            Err(EngineError::DuplicateWord(_))
        ));
        assert!(matches!(
            engine.update_word(99, "سَر", Vec::new(), Vec::new()),
            Err(EngineError::WordNotFound(99))
        ));
    }

    #[test]
    fn list_words_pages_newest_first() {
        let engine = RhymeEngine::new();
        for word in ["سَر", "دَر", "بَر", "تَر"] {
            let resolution = engine.resolve(word, None).unwrap();
            engine.confirm(&resolution).unwrap();
        }
        let page = engine.list_words(None, "", 2, 3);
        assert_eq!(page.info.total_items, 4);
        assert_eq!(page.info.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].full_form(), "سَر");

        let searched = engine.list_words(None, "ب", 1, 10);
        assert_eq!(searched.items.len(), 1);
        assert_eq!(searched.items[0].full_form(), "بَر");
    }

    #[test]
    fn background_upload_completes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "grapheme,organized_grapheme").unwrap();
        writeln!(file, "کاسه,کاسِه").unwrap();
        writeln!(file, "دسته,دَستَه").unwrap();

        let engine = RhymeEngine::new();
        let (id, handle) = engine.upload_in_background("words.csv", file.path().to_path_buf());
        let loaded = handle.join().unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(engine.batch(id).unwrap().status, BatchStatus::Completed);
        assert_eq!(engine.get_records(id).unwrap().len(), 2);

        assert_eq!(engine.delete_batch(id).unwrap(), 2);
        assert!(matches!(engine.get_records(id), Err(EngineError::BatchNotFound(_))));
    }

    #[test]
    fn open_without_snapshot_starts_empty_and_save_writes_one() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            snapshot_path: Some(dir.path().join("state.bin")),
            ..EngineConfig::default()
        };
        let engine = RhymeEngine::open(config.clone());
        assert!(engine.words().is_empty());

        let resolution = engine.resolve("دَستَه", None).unwrap();
        engine.confirm(&resolution).unwrap();
        engine.save().unwrap();

        let reopened = RhymeEngine::open(config);
        assert!(reopened.find_word("دَستَه").is_some());
    }
}
