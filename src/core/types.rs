// src/core/types.rs
use crate::core::script::{self, PHONEME_DELIMITER, ZWNJ};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A unique identifier for a stored word entry.
pub type WordId = usize;
pub type BatchId = usize;
pub type RecordId = usize;

/// The unit of memoization and rhyme search.
///
/// Syllables, phonemes and the phoneme string are only ever replaced together
/// through [`WordEntry::set_analysis`], so the phoneme string always equals the
/// delimiter-join of the phonemes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    id: Option<WordId>,
    full_form: String,
    surface_form: String,
    bare_form: String,
    syllables: Vec<String>,
    phonemes: Vec<String>,
    phoneme_string: String,
    space_offsets: BTreeSet<usize>,
    soft_compound_offsets: BTreeSet<usize>,
    pub approved: bool,
    pub rejected: bool,
}

impl WordEntry {
    pub fn new(full_form: &str, syllables: Vec<String>, phonemes: Vec<String>) -> Self {
        let mut space_offsets = BTreeSet::new();
        let mut soft_compound_offsets = BTreeSet::new();
        for (i, c) in full_form.chars().enumerate() {
            match c {
                ' ' => {
                    space_offsets.insert(i);
                }
                ZWNJ => {
                    soft_compound_offsets.insert(i);
                }
                _ => {}
            }
        }

        let mut entry = Self {
            id: None,
            full_form: full_form.to_string(),
            surface_form: script::to_surface(full_form),
            bare_form: script::bare(full_form),
            syllables: Vec::new(),
            phonemes: Vec::new(),
            phoneme_string: String::new(),
            space_offsets,
            soft_compound_offsets,
            approved: false,
            rejected: false,
        };
        entry.set_analysis(syllables, phonemes);
        entry
    }

    /// Replaces the analysis output. Syllables and phonemes always travel together.
    pub fn set_analysis(&mut self, syllables: Vec<String>, phonemes: Vec<String>) {
        self.phoneme_string = phonemes.join(PHONEME_DELIMITER);
        self.syllables = syllables;
        self.phonemes = phonemes;
    }

    /// `None` until the entry has been persisted by a word store.
    pub fn id(&self) -> Option<WordId> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: WordId) {
        self.id = Some(id);
    }

    pub fn full_form(&self) -> &str {
        &self.full_form
    }

    pub fn surface_form(&self) -> &str {
        &self.surface_form
    }

    pub fn bare_form(&self) -> &str {
        &self.bare_form
    }

    pub fn syllables(&self) -> &[String] {
        &self.syllables
    }

    pub fn phonemes(&self) -> &[String] {
        &self.phonemes
    }

    pub fn phoneme_string(&self) -> &str {
        &self.phoneme_string
    }

    pub fn syllable_count(&self) -> usize {
        self.syllables.len()
    }

    pub fn space_offsets(&self) -> &BTreeSet<usize> {
        &self.space_offsets
    }

    pub fn soft_compound_offsets(&self) -> &BTreeSet<usize> {
        &self.soft_compound_offsets
    }

    /// Whether `offset` is a plain space or a soft-compound marker in the full form.
    pub fn is_boundary_offset(&self, offset: usize) -> bool {
        self.space_offsets.contains(&offset) || self.soft_compound_offsets.contains(&offset)
    }

    /// True when `run` occurs as whole, contiguous phonemes inside this entry.
    pub fn contains_phoneme_run(&self, run: &str) -> bool {
        if run.is_empty() {
            return true;
        }
        let haystack = format!("{d}{}{d}", self.phoneme_string, d = PHONEME_DELIMITER);
        let needle = format!("{d}{}{d}", run, d = PHONEME_DELIMITER);
        haystack.contains(&needle)
    }

    /// Index of the first exact contiguous occurrence of `run` in the phoneme list.
    pub fn find_phoneme_run(&self, run: &[String]) -> Option<usize> {
        if run.is_empty() || run.len() > self.phonemes.len() {
            return None;
        }
        self.phonemes.windows(run.len()).position(|window| window == run)
    }
}

/// Character-index hints that steer the orthography normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrthographyHints {
    pub exception_waw: Vec<usize>,
    pub silent_waw: Vec<usize>,
    pub spoken_a: Vec<usize>,
}

impl OrthographyHints {
    pub fn is_empty(&self) -> bool {
        self.exception_waw.is_empty() && self.silent_waw.is_empty() && self.spoken_a.is_empty()
    }

    /// Parses an index list such as `"5,7"`, `"۱، ۳"` or `"2 4"`.
    ///
    /// Persian and Arabic-Indic digits are accepted; fragments that are not a
    /// number are dropped. The result is sorted and de-duplicated.
    pub fn parse_list(text: &str) -> Vec<usize> {
        let latin: String = text.chars().map(to_latin_digit).collect();
        let mut out: Vec<usize> = latin
            .split(|c: char| c == ',' || c == '،' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .filter_map(|part| part.parse().ok())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

fn to_latin_digit(c: char) -> char {
    match c {
        '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
        '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
        _ => c,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

/// An uploaded file of word rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub file_name: String,
    pub status: BatchStatus,
    pub total_records: usize,
    pub inserted_records: usize,
    pub failed_records: usize,
    /// Rows dropped before insertion for lacking a grapheme column.
    pub invalid_rows: usize,
    pub error: Option<String>,
}

impl Batch {
    pub fn new(id: BatchId, file_name: &str) -> Self {
        Self {
            id,
            file_name: file_name.to_string(),
            status: BatchStatus::Uploaded,
            total_records: 0,
            inserted_records: 0,
            failed_records: 0,
            invalid_rows: 0,
            error: None,
        }
    }

    pub fn progress_percentage(&self) -> u32 {
        percent(self.inserted_records, self.total_records)
    }

    pub fn success_rate(&self) -> u32 {
        percent(
            self.total_records.saturating_sub(self.failed_records),
            self.total_records,
        )
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Pending,
    Processed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub num: Option<u32>,
    pub of_index: Option<usize>,
}

/// One row of an uploaded batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Assigned by the batch store on insertion.
    pub id: RecordId,
    pub batch: BatchId,
    pub raw_grapheme: String,
    pub annotated_grapheme: String,
    /// Phonemes supplied with the row, kept for inspection only.
    pub reference_phonemes: Vec<String>,
    pub hints: OrthographyHints,
    pub unwritten_a_phone_idx: Vec<usize>,
    pub variant: Option<Variant>,
    pub row_index: usize,
    pub status: RecordStatus,
    pub error: Option<String>,
    pub derived_syllables: Vec<String>,
    pub derived_phonemes: Vec<String>,
    pub added_to_words: bool,
}

impl BatchRecord {
    pub fn new(raw_grapheme: &str, annotated_grapheme: &str, row_index: usize) -> Self {
        Self {
            id: 0,
            batch: 0,
            raw_grapheme: raw_grapheme.to_string(),
            annotated_grapheme: annotated_grapheme.to_string(),
            reference_phonemes: Vec::new(),
            hints: OrthographyHints::default(),
            unwritten_a_phone_idx: Vec::new(),
            variant: None,
            row_index,
            status: RecordStatus::Pending,
            error: None,
            derived_syllables: Vec::new(),
            derived_phonemes: Vec::new(),
            added_to_words: false,
        }
    }

    pub fn with_hints(mut self, hints: OrthographyHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn mark_processed(&mut self, syllables: Vec<String>, phonemes: Vec<String>) {
        self.status = RecordStatus::Processed;
        self.error = None;
        self.derived_syllables = syllables;
        self.derived_phonemes = phonemes;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = RecordStatus::Failed;
        self.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn entry_derives_projections_from_full_form() {
        let entry = WordEntry::new(
            "کاسِه\u{200c}تُرمُز",
            strings(&["کا", "سِه", "تُر", "مُز"]),
            strings(&["آ", "اِ", "اُ", "اُ"]),
        );
        assert_eq!(entry.surface_form(), "کاسِه تُرمُز");
        assert_eq!(entry.bare_form(), "کاسه\u{200c}ترمز");
        assert_eq!(entry.phoneme_string(), "آ,اِ,اُ,اُ");
        assert!(entry.soft_compound_offsets().contains(&5));
        assert!(entry.space_offsets().is_empty());
        assert_eq!(entry.syllable_count(), 4);
        assert_eq!(entry.id(), None);
    }

    #[test]
    fn set_analysis_keeps_phoneme_string_in_sync() {
        let mut entry = WordEntry::new("سَر", strings(&["سَر"]), strings(&["اَ"]));
        entry.set_analysis(strings(&["سَ", "ری"]), strings(&["اَ", "ای"]));
        assert_eq!(entry.phoneme_string(), "اَ,ای");
    }

    #[test]
    fn phoneme_run_matches_whole_phonemes_only() {
        let entry = WordEntry::new("x", strings(&["x"]), strings(&["اَی", "آ"]));
        assert!(entry.contains_phoneme_run("اَی,آ"));
        assert!(!entry.contains_phoneme_run("ی,آ"));
        assert_eq!(entry.find_phoneme_run(&strings(&["آ"])), Some(1));
        assert_eq!(entry.find_phoneme_run(&strings(&["اِ"])), None);
    }

    #[test]
    fn hint_lists_accept_persian_digits_and_separators() {
        assert_eq!(OrthographyHints::parse_list("۳، 1 ,٢,x"), vec![1, 2, 3]);
        assert_eq!(OrthographyHints::parse_list(""), Vec::<usize>::new());
        assert_eq!(OrthographyHints::parse_list("5,5,7"), vec![5, 7]);
    }

    #[test]
    fn batch_rates_handle_empty_batches() {
        let mut batch = Batch::new(1, "words.csv");
        assert_eq!(batch.progress_percentage(), 0);
        batch.total_records = 4;
        batch.inserted_records = 3;
        batch.failed_records = 1;
        assert_eq!(batch.progress_percentage(), 75);
        assert_eq!(batch.success_rate(), 75);
    }
}
