// --- File: src/resolver.rs
//! Word resolution: reuse stored analyses token by token, analyze the rest.

use crate::core::analyzer::PhonemeAnalyzer;
use crate::core::orthography::OrthographyNormalizer;
use crate::core::script;
use crate::core::types::{OrthographyHints, WordEntry, WordId};
use crate::error::{EngineError, Result};
use crate::store::WordStore;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveMode {
    /// Store the whole compound when every token was already known.
    pub persist_compound: bool,
}

impl Default for ResolveMode {
    fn default() -> Self {
        Self { persist_compound: true }
    }
}

/// One space-separated token of a resolved text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub text: String,
    /// The stored entry, or a freshly analyzed unsaved candidate.
    pub entry: WordEntry,
}

impl ResolvedToken {
    pub fn is_known(&self) -> bool {
        self.entry.id().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tokens: Vec<ResolvedToken>,
    /// The combined representation of the whole text.
    pub entry: WordEntry,
    /// Every token was already in the store.
    pub pass: bool,
}

impl Resolution {
    pub fn id(&self) -> Option<WordId> {
        self.entry.id()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordResolver {
    analyzer: PhonemeAnalyzer,
    normalizer: OrthographyNormalizer,
}

impl WordResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyzer(&self) -> &PhonemeAnalyzer {
        &self.analyzer
    }

    pub fn normalizer(&self) -> &OrthographyNormalizer {
        &self.normalizer
    }

    pub fn resolve<W: WordStore + ?Sized>(
        &self,
        store: &W,
        text: &str,
        hints: Option<&OrthographyHints>,
        mode: ResolveMode,
    ) -> Result<Resolution> {
        let text = match hints {
            Some(hints) => self.normalizer.normalize(text, hints),
            None => text.to_string(),
        };
        // Soft-compound markers stay in the stored form; tokens are looked up
        // on the surface copy.
        let full_form = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let surface = script::to_surface(&full_form);
        let words: Vec<&str> = surface.split_whitespace().collect();
        let spaced = words.join(" ");

        let mut tokens = Vec::with_capacity(words.len());
        let mut syllables = Vec::new();
        let mut phonemes = Vec::new();
        for word in &words {
            let entry = match store.find_by_full_form(word) {
                Some(stored) => stored,
                None => {
                    let analysis = self.analyzer.analyze(word);
                    WordEntry::new(word, analysis.syllables, analysis.phonemes)
                }
            };
            syllables.extend_from_slice(entry.syllables());
            phonemes.extend_from_slice(entry.phonemes());
            tokens.push(ResolvedToken { text: word.to_string(), entry });
        }
        let pass = !tokens.is_empty() && tokens.iter().all(ResolvedToken::is_known);

        let stored = store
            .find_by_full_form(&full_form)
            .or_else(|| store.find_by_full_form(&spaced));
        if let Some(stored) = stored {
            debug!(word = %full_form, id = ?stored.id(), "resolved to stored entry");
            return Ok(Resolution { tokens, entry: stored, pass });
        }

        let mut entry = WordEntry::new(&full_form, syllables, phonemes);
        if pass && mode.persist_compound {
            let id = insert_or_reuse(store, entry.clone())?;
            entry = store.get(id).ok_or(EngineError::WordNotFound(id))?;
            debug!(word = %full_form, id, "stored fully resolved compound");
        }
        Ok(Resolution { tokens, entry, pass })
    }

    /// Stores every unsaved token and the whole text, returning the id of the latter.
    pub fn confirm<W: WordStore + ?Sized>(&self, store: &W, resolution: &Resolution) -> Result<WordId> {
        for token in resolution.tokens.iter().filter(|t| !t.is_known()) {
            insert_or_reuse(store, token.entry.clone())?;
        }
        match resolution.entry.id() {
            Some(id) if store.get(id).is_some() => Ok(id),
            _ => insert_or_reuse(store, resolution.entry.clone()),
        }
    }
}

/// Inserts `entry`, or returns the id already stored under its full form.
pub(crate) fn insert_or_reuse<W: WordStore + ?Sized>(store: &W, entry: WordEntry) -> Result<WordId> {
    let full_form = entry.full_form().to_string();
    match store.insert(entry) {
        Ok(id) => Ok(id),
        Err(EngineError::DuplicateWord(_)) => store
            .find_by_full_form(&full_form)
            .and_then(|e| e.id())
            .ok_or(EngineError::DuplicateWord(full_form)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryWordStore;

    fn seed(store: &MemoryWordStore, resolver: &WordResolver, word: &str) -> WordId {
        let analysis = resolver.analyzer().analyze(word);
        store
            .insert(WordEntry::new(word, analysis.syllables, analysis.phonemes))
            .unwrap()
    }

    #[test]
    fn known_tokens_are_reused_and_compound_is_stored() {
        let store = MemoryWordStore::new();
        let resolver = WordResolver::new();
        seed(&store, &resolver, "کاسِه");
        seed(&store, &resolver, "دَستَه");

        let resolution = resolver
            .resolve(&store, "کاسِه  دَستَه", None, ResolveMode::default())
            .unwrap();
        assert!(resolution.pass);
        assert_eq!(resolution.entry.full_form(), "کاسِه دَستَه");
        assert_eq!(resolution.entry.syllable_count(), 4);
        assert!(resolution.id().is_some());
        assert_eq!(store.len(), 3);

        // A second resolution reuses the stored compound.
        let again = resolver
            .resolve(&store, "کاسِه دَستَه", None, ResolveMode::default())
            .unwrap();
        assert_eq!(again.id(), resolution.id());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn compound_is_not_stored_when_mode_forbids_it() {
        let store = MemoryWordStore::new();
        let resolver = WordResolver::new();
        seed(&store, &resolver, "کاسِه");
        seed(&store, &resolver, "دَستَه");

        let resolution = resolver
            .resolve(&store, "کاسِه دَستَه", None, ResolveMode { persist_compound: false })
            .unwrap();
        assert!(resolution.pass);
        assert_eq!(resolution.id(), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn novel_tokens_are_unsaved_candidates() {
        let store = MemoryWordStore::new();
        let resolver = WordResolver::new();
        seed(&store, &resolver, "کاسِه");

        let resolution = resolver
            .resolve(&store, "کاسِه دَستَه", None, ResolveMode::default())
            .unwrap();
        assert!(!resolution.pass);
        assert!(resolution.tokens[0].is_known());
        assert!(!resolution.tokens[1].is_known());
        assert_eq!(resolution.id(), None);
        assert_eq!(store.len(), 1);

        let id = resolver.confirm(&store, &resolution).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(id).unwrap().full_form(), "کاسِه دَستَه");
        assert!(store.find_by_full_form("دَستَه").is_some());
    }

    #[test]
    fn soft_compound_markers_split_tokens() {
        let store = MemoryWordStore::new();
        let resolver = WordResolver::new();
        let resolution = resolver
            .resolve(&store, "کاسِه\u{200c}دَستَه", None, ResolveMode::default())
            .unwrap();
        assert_eq!(resolution.tokens.len(), 2);
        assert_eq!(resolution.entry.full_form(), "کاسِه\u{200c}دَستَه");
        assert_eq!(resolution.entry.surface_form(), "کاسِه دَستَه");

        let id = resolver.confirm(&store, &resolution).unwrap();
        let stored = store.get(id).unwrap();
        assert!(stored.soft_compound_offsets().contains(&5));
        assert!(stored.space_offsets().is_empty());
    }

    #[test]
    fn compounds_stored_with_markers_are_found_again() {
        let store = MemoryWordStore::new();
        let resolver = WordResolver::new();
        seed(&store, &resolver, "کاسِه");
        seed(&store, &resolver, "دَستَه");
        let compound = seed(&store, &resolver, "کاسِه\u{200c}دَستَه");

        let same = resolver
            .resolve(&store, "کاسِه\u{200c}دَستَه", None, ResolveMode::default())
            .unwrap();
        assert_eq!(same.id(), Some(compound));

        let spaced = resolver
            .resolve(&store, "کاسِه دَستَه", None, ResolveMode::default())
            .unwrap();
        assert_eq!(spaced.id(), Some(compound));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn hints_apply_before_splitting() {
        let store = MemoryWordStore::new();
        let resolver = WordResolver::new();
        let hints = OrthographyHints { spoken_a: vec![1], ..OrthographyHints::default() };
        let resolution = resolver
            .resolve(&store, "چهار", Some(&hints), ResolveMode::default())
            .unwrap();
        assert_eq!(resolution.entry.full_form(), "چاهار");
    }
}
