// --- File: src/rhyme/matcher.rs
use crate::core::script::{self, PHONEME_DELIMITER};
use crate::core::types::WordEntry;
use crate::store::ScanFilter;

/// Shortest rhyme, in syllables.
pub const MIN_RHYME_LENGTH: usize = 2;

/// What a candidate has to share with the anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhymeKey {
    /// Syllables rhymed on, already clamped to the anchor.
    pub length: usize,
    /// The anchor's phonemes inside the window.
    pub phonemes: Vec<String>,
    /// The anchor's syllables inside the window, for the professional check.
    pub syllables: Vec<String>,
    /// The anchor's last `length` characters, used by the traditional mode.
    pub suffix: String,
}

impl RhymeKey {
    /// Keys on the anchor's last `length` syllables.
    pub fn from_anchor(anchor: &WordEntry, length: usize) -> Self {
        let phonemes = anchor.phonemes();
        let syllables = anchor.syllables();
        Self::build(
            anchor,
            length,
            &phonemes[phonemes.len().saturating_sub(length)..],
            &syllables[syllables.len().saturating_sub(length)..],
        )
    }

    /// Keys on `length` syllables starting at syllable `start`.
    pub fn from_window(anchor: &WordEntry, start: usize, length: usize) -> Self {
        let window = |items: &[String]| -> Vec<String> {
            items.iter().skip(start).take(length).cloned().collect()
        };
        Self::build(
            anchor,
            length,
            &window(anchor.phonemes()),
            &window(anchor.syllables()),
        )
    }

    fn build(anchor: &WordEntry, length: usize, phonemes: &[String], syllables: &[String]) -> Self {
        let chars: Vec<char> = anchor.surface_form().chars().collect();
        let suffix = chars[chars.len().saturating_sub(length)..].iter().collect();
        Self {
            length,
            phonemes: phonemes.to_vec(),
            syllables: syllables.to_vec(),
            suffix,
        }
    }

    pub fn phoneme_run(&self) -> String {
        self.phonemes.join(PHONEME_DELIMITER)
    }

    /// Store-side predicates: the phoneme run plus either the exact syllable
    /// count or, in traditional mode, the literal suffix.
    pub fn scan_filter(&self, letters: &[String], traditional: bool) -> ScanFilter {
        ScanFilter {
            syllable_count: (!traditional).then_some(self.length),
            phoneme_run: Some(self.phoneme_run()),
            surface_suffix: traditional.then(|| self.suffix.clone()),
            bare_contains_all: letters.to_vec(),
            ..ScanFilter::default()
        }
    }
}

/// Splits a letter filter such as `"ر,د"` into its literals.
pub fn parse_letter_filter(filter: &str) -> Vec<String> {
    filter
        .split([',', '،'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn ends_in_vowel(syllable: &str) -> bool {
    syllable.chars().last().is_some_and(script::is_vowel_class)
}

/// The key's syllables and the candidate's trailing syllables agree, one by
/// one, on whether each syllable ends in a vowel.
pub fn agrees_professionally(key: &RhymeKey, candidate: &WordEntry) -> bool {
    let c = candidate.syllables();
    let n = key.syllables.len();
    if n < key.length || c.len() < n {
        return false;
    }
    key.syllables
        .iter()
        .zip(&c[c.len() - n..])
        .all(|(x, y)| ends_in_vowel(x) == ends_in_vowel(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::KASRA;

    fn entry(full: &str, syllables: &[&str], phonemes: &[&str]) -> WordEntry {
        WordEntry::new(
            full,
            syllables.iter().map(|s| s.to_string()).collect(),
            phonemes.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn key_takes_trailing_phonemes_and_characters() {
        let anchor = entry("دَستَه", &["دَس", "تَه"], &["اَ", "اَ"]);
        let key = RhymeKey::from_anchor(&anchor, 2);
        assert_eq!(key.phoneme_run(), "اَ,اَ");
        assert_eq!(key.suffix.chars().count(), 2);
        assert!(anchor.surface_form().ends_with(&key.suffix));
    }

    #[test]
    fn scan_filter_switches_on_traditional_mode() {
        let anchor = entry("کاسِه", &["کا", "سِه"], &["آ", "اِ"]);
        let key = RhymeKey::from_anchor(&anchor, 2);
        let letters = parse_letter_filter("س");

        let phonemic = key.scan_filter(&letters, false);
        assert_eq!(phonemic.syllable_count, Some(2));
        assert_eq!(phonemic.surface_suffix, None);

        let literal = key.scan_filter(&letters, true);
        assert_eq!(literal.syllable_count, None);
        assert_eq!(literal.surface_suffix, Some(format!("{KASRA}ه")));
        assert_eq!(literal.bare_contains_all, vec!["س".to_string()]);
    }

    #[test]
    fn letter_filter_accepts_both_commas() {
        assert_eq!(parse_letter_filter(" ر، د ,,"), vec!["ر".to_string(), "د".to_string()]);
        assert!(parse_letter_filter("").is_empty());
    }

    #[test]
    fn professional_compares_syllable_codas() {
        let anchor = entry("کاسِه", &["کا", "سِه"], &["آ", "اِ"]);
        let key = RhymeKey::from_anchor(&anchor, 2);
        let open = entry("پاره", &["پا", "رِه"], &["آ", "اِ"]);
        let closed = entry("کارد", &["کار", "دِه"], &["آ", "اِ"]);
        let short = entry("ده", &["دِه"], &["اِ"]);
        assert!(agrees_professionally(&key, &open));
        assert!(!agrees_professionally(&key, &closed));
        assert!(!agrees_professionally(&key, &short));
    }

    #[test]
    fn window_key_starts_at_the_skipped_syllable() {
        let anchor = entry(
            "بی\u{200c}پارِه\u{200c}ها",
            &["بی", "پا", "رِه", "ها"],
            &["ای", "آ", "اِ", "آ"],
        );
        let key = RhymeKey::from_window(&anchor, 1, 2);
        assert_eq!(key.phoneme_run(), "آ,اِ");
        assert_eq!(key.syllables, vec!["پا".to_string(), "رِه".to_string()]);
        assert_eq!(RhymeKey::from_anchor(&anchor, 2).phoneme_run(), "اِ,آ");

        // A window running past the end is cut short and matches nothing professionally.
        let past = RhymeKey::from_window(&anchor, 3, 2);
        assert_eq!(past.phonemes.len(), 1);
        assert!(!agrees_professionally(&past, &entry("پاها", &["پا", "ها"], &["آ", "آ"])));
    }
}
