// src/core/orthography.rs
use crate::core::script::{self, ALEF, DAMMA, WAW};
use crate::core::types::OrthographyHints;
use tracing::debug;

/// A base character together with the diacritics attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Grapheme {
    pub base: char,
    pub marks: String,
}

impl Grapheme {
    pub fn bare(base: char) -> Self {
        Self { base, marks: String::new() }
    }

    pub fn has_mark(&self, mark: char) -> bool {
        self.marks.contains(mark)
    }
}

/// Splits a word into graphemes. Every diacritic belongs to the nearest
/// preceding base character; marks with no base before them are dropped.
pub(crate) fn tokenize(word: &str) -> Vec<Grapheme> {
    let mut out: Vec<Grapheme> = Vec::with_capacity(word.len() / 2);
    for c in word.chars() {
        if script::is_diacritic(c) {
            if let Some(last) = out.last_mut() {
                last.marks.push(c);
            }
        } else {
            out.push(Grapheme::bare(c));
        }
    }
    out
}

pub(crate) fn join(graphemes: &[Grapheme]) -> String {
    let mut out = String::new();
    for g in graphemes {
        out.push(g.base);
        out.push_str(&g.marks);
    }
    out
}

/// Applies index-targeted spelling corrections before analysis.
///
/// Indices address graphemes (base characters), not code points. Hints that
/// are out of range or point at the wrong letter are ignored.
#[derive(Debug, Clone, Copy)]
pub struct OrthographyNormalizer;

impl OrthographyNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, word: &str, hints: &OrthographyHints) -> String {
        if hints.is_empty() {
            return word.to_string();
        }
        let mut tokens = tokenize(word);
        if tokens.is_empty() {
            return word.to_string();
        }

        self.apply_exception_waw(&mut tokens, &sorted(&hints.exception_waw));
        self.apply_silent_waw(&mut tokens, &sorted(&hints.silent_waw));
        self.apply_spoken_a(&mut tokens, &sorted(&hints.spoken_a));

        let out = join(&tokens);
        debug!(input = word, output = %out, "orthography normalized");
        out
    }

    /// An exceptional waw is read as a damma on the preceding letter.
    fn apply_exception_waw(&self, tokens: &mut Vec<Grapheme>, indices: &[usize]) {
        for &idx in indices.iter().rev() {
            if tokens.get(idx).map(|t| t.base) != Some(WAW) {
                continue;
            }
            let Some(prev) = previous_base(tokens, idx) else {
                continue;
            };
            let kept: String = tokens[prev]
                .marks
                .chars()
                .filter(|&c| !script::is_short_vowel(c))
                .collect();
            tokens[prev].marks = kept;
            tokens[prev].marks.push(DAMMA);
            tokens.remove(idx);
        }
    }

    fn apply_silent_waw(&self, tokens: &mut Vec<Grapheme>, indices: &[usize]) {
        for &idx in indices.iter().rev() {
            if tokens.get(idx).map(|t| t.base) == Some(WAW) {
                tokens.remove(idx);
            }
        }
    }

    /// Low-to-high; every insertion inside the word shifts later indices by
    /// one. Appending at the end does not, so consecutive trailing hints each
    /// add an alef.
    fn apply_spoken_a(&self, tokens: &mut Vec<Grapheme>, indices: &[usize]) {
        let mut offset = 0;
        for &raw in indices {
            let idx = raw + offset;
            if idx < tokens.len() {
                if script::is_vowel_carrier(tokens[idx].base) {
                    tokens[idx].base = ALEF;
                } else {
                    tokens.insert(idx, Grapheme::bare(ALEF));
                    offset += 1;
                }
            } else if idx == tokens.len() {
                tokens.push(Grapheme::bare(ALEF));
            }
        }
    }
}

impl Default for OrthographyNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted(indices: &[usize]) -> Vec<usize> {
    let mut out = indices.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}

fn previous_base(tokens: &[Grapheme], idx: usize) -> Option<usize> {
    (0..idx).rev().find(|&j| !script::is_boundary(tokens[j].base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::{FATHA, SHADDA};

    fn hints(exception: &[usize], silent: &[usize], spoken: &[usize]) -> OrthographyHints {
        OrthographyHints {
            exception_waw: exception.to_vec(),
            silent_waw: silent.to_vec(),
            spoken_a: spoken.to_vec(),
        }
    }

    #[test]
    fn tokenizer_attaches_marks_to_previous_base() {
        let word = format!("{FATHA}ب{FATHA}{SHADDA}د");
        let tokens = tokenize(&word);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].base, 'ب');
        assert_eq!(tokens[0].marks, format!("{FATHA}{SHADDA}"));
        assert_eq!(join(&tokens), format!("ب{FATHA}{SHADDA}د"));
    }

    #[test]
    fn no_hints_is_identity() {
        let n = OrthographyNormalizer::new();
        assert_eq!(n.normalize("خواهَر", &OrthographyHints::default()), "خواهَر");
        assert_eq!(n.normalize("خواهَر", &hints(&[], &[9], &[])), "خواهَر");
    }

    #[test]
    fn silent_waw_is_removed() {
        let n = OrthographyNormalizer::new();
        assert_eq!(n.normalize("خور", &hints(&[], &[1], &[])), "خر");
    }

    #[test]
    fn silent_waw_ignores_other_letters() {
        let n = OrthographyNormalizer::new();
        assert_eq!(n.normalize("خور", &hints(&[], &[0, 2], &[])), "خور");
    }

    #[test]
    fn exception_waw_becomes_damma_on_previous_letter() {
        let n = OrthographyNormalizer::new();
        assert_eq!(n.normalize("دَوره", &hints(&[1], &[], &[])), "دُره");
    }

    #[test]
    fn exception_waw_keeps_shadda_on_previous_letter() {
        let n = OrthographyNormalizer::new();
        let word = format!("ت{SHADDA}{FATHA}و");
        let out = n.normalize(&word, &hints(&[1], &[], &[]));
        assert_eq!(out, format!("ت{SHADDA}\u{064f}"));
    }

    #[test]
    fn exception_waw_skips_boundaries_when_looking_back() {
        let n = OrthographyNormalizer::new();
        assert_eq!(n.normalize("ب\u{200c}وم", &hints(&[2], &[], &[])), "بُ\u{200c}م");
    }

    #[test]
    fn spoken_a_inserts_or_replaces() {
        let n = OrthographyNormalizer::new();
        assert_eq!(n.normalize("چهار", &hints(&[], &[], &[1])), "چاهار");
        assert_eq!(n.normalize("چهار", &hints(&[], &[], &[2])), "چهار");
        assert_eq!(n.normalize("اعلی", &hints(&[], &[], &[3])), "اعلا");
        assert_eq!(n.normalize("اعلی", &hints(&[], &[], &[4])), "اعلیا");
    }

    #[test]
    fn spoken_a_tracks_insertion_offset() {
        let n = OrthographyNormalizer::new();
        // Both original positions 1 and 2 receive an alef.
        assert_eq!(n.normalize("بدر", &hints(&[], &[], &[1, 2])), "بادار");
    }

    #[test]
    fn spoken_a_appends_once_per_trailing_index() {
        let n = OrthographyNormalizer::new();
        assert_eq!(n.normalize("بدر", &hints(&[], &[], &[3, 4])), "بدراا");
        assert_eq!(n.normalize("بدر", &hints(&[], &[], &[3, 5])), "بدرا");
    }

    #[test]
    fn passes_run_in_order() {
        let n = OrthographyNormalizer::new();
        // Silent waw removal shifts the later letters before the spoken-A pass.
        assert_eq!(n.normalize("خوش", &hints(&[], &[1], &[1])), "خاش");
    }
}
