//! Rhyme search over the word store.
//!
//! A query takes the anchor's trailing phonemes as the key, lets the store
//! pre-filter an over-fetch window, optionally applies the professional
//! coda check, then attaches a highlight span and paginates.

pub mod highlight;
pub mod matcher;
pub mod page;

use crate::config::RhymeConfig;
use crate::core::types::{WordEntry, WordId};
use crate::error::{EngineError, Result};
use crate::store::WordStore;
use serde::Serialize;
use tracing::debug;

pub use highlight::Span;
pub use matcher::{RhymeKey, MIN_RHYME_LENGTH};
pub use page::{paginate, Page, PageInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhymeQuery {
    pub anchor: WordId,
    /// Syllables to rhyme on.
    pub length: usize,
    /// Start the key window this many syllables into the anchor instead of
    /// at its tail.
    pub skip: Option<usize>,
    /// Comma-separated literals every candidate's bare form must contain.
    pub letters: String,
    /// Match the anchor's trailing characters instead of the syllable count.
    pub traditional: bool,
    pub professional: bool,
    pub page: usize,
    pub limit: usize,
}

impl RhymeQuery {
    pub fn new(anchor: WordId, length: usize) -> Self {
        Self {
            anchor,
            length,
            skip: None,
            letters: String::new(),
            traditional: false,
            professional: false,
            page: 1,
            limit: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RhymeMatch {
    pub id: Option<WordId>,
    pub full_form: String,
    pub surface_form: String,
    pub syllables: Vec<String>,
    pub phoneme_string: String,
    pub highlight: Option<Span>,
}

impl RhymeMatch {
    fn new(entry: WordEntry, highlight: Option<Span>) -> Self {
        Self {
            id: entry.id(),
            full_form: entry.full_form().to_string(),
            surface_form: entry.surface_form().to_string(),
            syllables: entry.syllables().to_vec(),
            phoneme_string: entry.phoneme_string().to_string(),
            highlight,
        }
    }
}

pub type RhymePage = Page<RhymeMatch>;

#[derive(Debug, Clone, Default)]
pub struct RhymeMatcher {
    config: RhymeConfig,
}

impl RhymeMatcher {
    pub fn new(config: RhymeConfig) -> Self {
        Self { config }
    }

    pub fn find_rhymes<W: WordStore + ?Sized>(&self, store: &W, query: &RhymeQuery) -> Result<RhymePage> {
        let anchor = store
            .get(query.anchor)
            .ok_or(EngineError::AnchorNotFound(query.anchor))?;
        let (key, length) = match query.skip {
            None => {
                let length = clamp_length(&anchor, query.length, 0)?;
                (RhymeKey::from_anchor(&anchor, length), length)
            }
            Some(skip) => {
                let length = clamp_length(&anchor, query.length, skip)?;
                (RhymeKey::from_window(&anchor, skip, length), length)
            }
        };
        let letters = matcher::parse_letter_filter(&query.letters);
        let limit = if query.limit == 0 { self.config.default_limit } else { query.limit };

        let matches: Vec<RhymeMatch> = self
            .candidates(store, &key, &letters, query.traditional, query.professional, limit)
            .into_iter()
            .map(|entry| {
                let span = if query.traditional {
                    highlight::trailing_span(&entry, length)
                } else {
                    highlight::phonemic_span(&entry, &key.phonemes)
                };
                RhymeMatch::new(entry, span)
            })
            .collect();

        debug!(
            anchor = query.anchor,
            length,
            matches = matches.len(),
            "rhyme search finished"
        );
        Ok(paginate(matches, query.page, limit))
    }

    /// Rhyme lengths, longest first, that produce at least one candidate.
    pub fn viable_lengths<W: WordStore + ?Sized>(
        &self,
        store: &W,
        anchor: WordId,
        letters: &str,
        professional: bool,
    ) -> Result<Vec<usize>> {
        let anchor = store.get(anchor).ok_or(EngineError::AnchorNotFound(anchor))?;
        let letters = matcher::parse_letter_filter(letters);
        let longest = anchor.syllable_count().saturating_sub(1);
        let viable = (MIN_RHYME_LENGTH..=longest)
            .rev()
            .filter(|&length| {
                let key = RhymeKey::from_anchor(&anchor, length);
                !self
                    .candidates(store, &key, &letters, false, professional, 1)
                    .is_empty()
            })
            .collect();
        Ok(viable)
    }

    #[allow(clippy::too_many_arguments)]
    fn candidates<W: WordStore + ?Sized>(
        &self,
        store: &W,
        key: &RhymeKey,
        letters: &[String],
        traditional: bool,
        professional: bool,
        limit: usize,
    ) -> Vec<WordEntry> {
        let filter = key.scan_filter(letters, traditional);
        let mut found = store.scan(&filter, 0, self.config.fetch_window(limit));
        if professional {
            found.retain(|candidate| matcher::agrees_professionally(key, candidate));
        }
        found
    }
}

/// Clamps a requested length to the syllables left after `skip`; anything
/// under two syllables is invalid.
fn clamp_length(anchor: &WordEntry, requested: usize, skip: usize) -> Result<usize> {
    let length = requested.min(anchor.syllable_count().saturating_sub(skip));
    if requested < MIN_RHYME_LENGTH || length < MIN_RHYME_LENGTH {
        return Err(EngineError::InvalidLength { requested, minimum: MIN_RHYME_LENGTH });
    }
    Ok(length)
}
