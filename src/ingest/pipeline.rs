// --- File: src/ingest/pipeline.rs
use crate::core::script::{self, ZWNJ};
use crate::core::types::{Batch, BatchId, BatchRecord, BatchStatus, RecordStatus, WordEntry};
use crate::error::{EngineError, Result};
use crate::ingest::csv::{self, ParsedFile};
use crate::resolver::{self, ResolveMode, WordResolver};
use crate::store::{BatchStore, WordStore};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Counters for one ingestion or reprocessing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub processed: usize,
    pub failed: usize,
    /// Records whose word is already approved; left untouched.
    pub skipped: usize,
    /// Sub-records created from soft-compound parts.
    pub parts_created: usize,
    pub words_created: usize,
}

/// Turns uploaded files into batch records and batch records into word entries.
///
/// Records of one batch are processed strictly in `row_index` order by the
/// calling thread, so part de-duplication sees earlier writes.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    resolver: WordResolver,
    chunk_size: usize,
}

impl IngestPipeline {
    pub fn new(chunk_size: usize) -> Self {
        Self { resolver: WordResolver::new(), chunk_size: chunk_size.max(1) }
    }

    /// Reads a CSV file into the batch. The batch ends `Completed` even when
    /// some rows fail to insert, or `Failed` when the file cannot be read.
    pub fn load_file<B: BatchStore + ?Sized>(&self, batches: &B, batch_id: BatchId, path: &Path) -> Result<Batch> {
        let mut batch = batches.batch(batch_id).ok_or(EngineError::BatchNotFound(batch_id))?;
        batch.status = BatchStatus::Processing;
        batches.update_batch(&batch)?;

        let parsed = File::open(path)
            .map_err(EngineError::from)
            .and_then(|file| csv::read_records(BufReader::new(file)));
        match parsed {
            Ok(parsed) => self.load_records(batches, batch_id, parsed),
            Err(e) => {
                warn!(batch = batch_id, path = %path.display(), error = %e, "could not read batch file");
                batch.status = BatchStatus::Failed;
                batch.error = Some(e.to_string());
                batches.update_batch(&batch)?;
                Err(e)
            }
        }
    }

    /// Inserts parsed rows in fixed-size chunks, counting rows the store rejects.
    pub fn load_records<B: BatchStore + ?Sized>(
        &self,
        batches: &B,
        batch_id: BatchId,
        parsed: ParsedFile,
    ) -> Result<Batch> {
        let mut batch = batches.batch(batch_id).ok_or(EngineError::BatchNotFound(batch_id))?;
        batch.status = BatchStatus::Processing;
        batch.total_records = parsed.records.len();
        batch.invalid_rows = parsed.invalid_rows;
        batch.inserted_records = 0;
        batch.failed_records = 0;

        let chunk_count = parsed.records.len().div_ceil(self.chunk_size);
        let mut records = parsed.records.into_iter().peekable();
        let mut chunk_no = 0;
        while records.peek().is_some() {
            chunk_no += 1;
            let chunk: Vec<BatchRecord> = records.by_ref().take(self.chunk_size).collect();
            let outcome = batches.insert_records(batch_id, chunk);
            batch.inserted_records += outcome.inserted;
            batch.failed_records += outcome.failed();
            for failure in &outcome.failures {
                warn!(batch = batch_id, row = failure.row_index, reason = %failure.reason, "row not inserted");
            }
            info!(batch = batch_id, chunk = chunk_no, of = chunk_count, inserted = outcome.inserted, "inserted chunk");
            batches.update_batch(&batch)?;
        }

        batch.status = BatchStatus::Completed;
        batches.update_batch(&batch)?;
        info!(
            batch = batch_id,
            inserted = batch.inserted_records,
            failed = batch.failed_records,
            invalid = batch.invalid_rows,
            "batch loaded"
        );
        Ok(batch)
    }

    /// Processes every pending record of the batch.
    pub fn ingest<W, B>(&self, words: &W, batches: &B, batch_id: BatchId) -> Result<IngestReport>
    where
        W: WordStore + ?Sized,
        B: BatchStore + ?Sized,
    {
        self.run(words, batches, batch_id, |status| status == RecordStatus::Pending)
    }

    /// Re-derives pending and processed records. Failed records are left alone.
    pub fn reprocess<W, B>(&self, words: &W, batches: &B, batch_id: BatchId) -> Result<IngestReport>
    where
        W: WordStore + ?Sized,
        B: BatchStore + ?Sized,
    {
        self.run(words, batches, batch_id, |status| status != RecordStatus::Failed)
    }

    fn run<W, B>(
        &self,
        words: &W,
        batches: &B,
        batch_id: BatchId,
        wanted: impl Fn(RecordStatus) -> bool,
    ) -> Result<IngestReport>
    where
        W: WordStore + ?Sized,
        B: BatchStore + ?Sized,
    {
        if batches.batch(batch_id).is_none() {
            return Err(EngineError::BatchNotFound(batch_id));
        }
        let mut report = IngestReport::default();
        // Sub-records created along the way are appended to the batch; only
        // the records present at the start are visited.
        let selected: Vec<BatchRecord> = batches
            .records(batch_id)
            .into_iter()
            .filter(|r| wanted(r.status))
            .collect();

        for record in selected {
            let row = record.row_index;
            if let Err(e) = self.process_record(words, batches, record, &mut report) {
                warn!(batch = batch_id, row, error = %e, "record could not be processed");
            }
        }
        info!(
            batch = batch_id,
            processed = report.processed,
            failed = report.failed,
            skipped = report.skipped,
            parts = report.parts_created,
            "batch records processed"
        );
        Ok(report)
    }

    fn process_record<W, B>(
        &self,
        words: &W,
        batches: &B,
        mut record: BatchRecord,
        report: &mut IngestReport,
    ) -> Result<()>
    where
        W: WordStore + ?Sized,
        B: BatchStore + ?Sized,
    {
        let text = record_text(&record).to_string();
        let normalized = self.resolver.normalizer().normalize(&text, &record.hints);
        if [text.as_str(), normalized.as_str()]
            .iter()
            .any(|candidate| is_approved(words, candidate) || is_approved(words, &spaced(candidate)))
        {
            debug!(row = record.row_index, word = %text, "word already approved, skipping");
            report.skipped += 1;
            return Ok(());
        }

        if record.status == RecordStatus::Processed {
            record.status = RecordStatus::Pending;
        }

        if normalized.contains(ZWNJ) {
            if let Err(e) = self.split_compound(words, batches, &record, &normalized, report) {
                warn!(row = record.row_index, error = %e, "compound parts could not be stored");
                record.mark_failed(e.to_string());
                report.failed += 1;
                return batches.update_record(&record);
            }
            // The parts stand in for the compound in the word store.
            record.added_to_words = true;
        }

        let outcome = self
            .resolver
            .resolve(words, &normalized, None, ResolveMode { persist_compound: false });
        match outcome {
            Ok(resolution) if !resolution.entry.syllables().is_empty() && !resolution.entry.phonemes().is_empty() => {
                record.mark_processed(
                    resolution.entry.syllables().to_vec(),
                    resolution.entry.phonemes().to_vec(),
                );
                report.processed += 1;
            }
            Ok(_) => {
                record.mark_failed("no syllables or phonemes could be derived");
                report.failed += 1;
            }
            Err(e) => {
                record.mark_failed(e.to_string());
                report.failed += 1;
            }
        }
        batches.update_record(&record)
    }

    /// Stores every new, analyzable part of a soft compound as its own word and record.
    fn split_compound<W, B>(
        &self,
        words: &W,
        batches: &B,
        record: &BatchRecord,
        normalized: &str,
        report: &mut IngestReport,
    ) -> Result<()>
    where
        W: WordStore + ?Sized,
        B: BatchStore + ?Sized,
    {
        let mut next_row = batches.max_row_index(record.batch);
        for part in normalized.split(ZWNJ).map(str::trim).filter(|p| !p.is_empty()) {
            if is_approved(words, part) {
                debug!(part, "part already approved");
                continue;
            }
            if batches.has_record_text(record.batch, part) {
                debug!(part, "part already recorded in batch");
                continue;
            }
            let analysis = self.resolver.analyzer().analyze(part);
            if !analysis.is_usable() {
                debug!(part, "part yields no phonemes");
                continue;
            }

            let created = match words.find_by_full_form(part) {
                Some(_) => None,
                None => {
                    let entry = WordEntry::new(part, analysis.syllables.clone(), analysis.phonemes.clone());
                    Some(resolver::insert_or_reuse(words, entry)?)
                }
            };

            next_row += 1;
            let mut sub = BatchRecord::new(part, part, next_row);
            sub.mark_processed(analysis.syllables, analysis.phonemes);
            sub.added_to_words = true;
            if let Err(e) = batches.insert_record(record.batch, sub) {
                // No word entry without its part record.
                if let Some(id) = created {
                    words.remove(id)?;
                }
                return Err(e);
            }
            if created.is_some() {
                report.words_created += 1;
            }
            report.parts_created += 1;
        }
        Ok(())
    }

    /// Adds a word entry for every processed record not yet in the word store.
    pub fn publish<W, B>(&self, words: &W, batches: &B, batch_id: BatchId) -> Result<usize>
    where
        W: WordStore + ?Sized,
        B: BatchStore + ?Sized,
    {
        if batches.batch(batch_id).is_none() {
            return Err(EngineError::BatchNotFound(batch_id));
        }
        let mut published = 0;
        for mut record in batches.records(batch_id) {
            if record.status != RecordStatus::Processed || record.added_to_words {
                continue;
            }
            let full_form = self.resolver.normalizer().normalize(record_text(&record), &record.hints);
            if words.find_by_full_form(&full_form).is_none() {
                let entry = WordEntry::new(
                    &full_form,
                    record.derived_syllables.clone(),
                    record.derived_phonemes.clone(),
                );
                resolver::insert_or_reuse(words, entry)?;
                published += 1;
            }
            record.added_to_words = true;
            batches.update_record(&record)?;
        }
        info!(batch = batch_id, published, "records published to word store");
        Ok(published)
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(500)
    }
}

fn record_text(record: &BatchRecord) -> &str {
    if record.annotated_grapheme.is_empty() {
        &record.raw_grapheme
    } else {
        &record.annotated_grapheme
    }
}

fn spaced(text: &str) -> String {
    script::to_surface(text).split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_approved<W: WordStore + ?Sized>(words: &W, text: &str) -> bool {
    words.find_by_full_form(text).is_some_and(|e| e.approved)
}
