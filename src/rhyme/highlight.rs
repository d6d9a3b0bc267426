// --- File: src/rhyme/highlight.rs
//! Maps a matched phoneme window back onto the characters of a candidate.

use crate::core::types::WordEntry;
use serde::Serialize;

/// Half-open range of character (not byte) offsets into `surface_form`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The highlighted text.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
        let start = indices.nth(self.start).unwrap_or(text.len());
        let end = if self.is_empty() {
            start
        } else {
            indices.nth(self.len() - 1).unwrap_or(text.len())
        };
        &text[start..end]
    }
}

/// Span of the syllables that carry the first occurrence of `key` in the
/// candidate's phonemes. Phoneme `j` is taken to belong to syllable `j`.
pub fn phonemic_span(candidate: &WordEntry, key: &[String]) -> Option<Span> {
    let first = candidate.find_phoneme_run(key)?;
    let last = first + key.len();
    if last > candidate.syllables().len() {
        return None;
    }

    let (expected_start, text) = syllable_window(candidate, first, last);
    if text.is_empty() {
        return None;
    }
    let width = text.chars().count();
    let surface = candidate.surface_form();

    let at_expected: String = surface.chars().skip(expected_start).take(width).collect();
    let start = if at_expected == text {
        expected_start
    } else {
        let byte = surface.find(&text)?;
        surface[..byte].chars().count()
    };
    Some(Span { start, end: start + width })
}

/// The trailing `n` characters of the candidate's surface form.
pub fn trailing_span(candidate: &WordEntry, n: usize) -> Option<Span> {
    let len = candidate.surface_form().chars().count();
    if n == 0 || n > len {
        return None;
    }
    Some(Span { start: len - n, end: len })
}

/// Rebuilds syllables `first..last` with the word's spaces put back, and
/// returns the character offset at which the window starts.
fn syllable_window(entry: &WordEntry, first: usize, last: usize) -> (usize, String) {
    let mut text = String::new();
    let mut start = 0;
    let mut offset = 0;
    for (i, syllable) in entry.syllables().iter().enumerate().take(last) {
        for c in syllable.chars() {
            while entry.is_boundary_offset(offset) {
                if i >= first && !text.is_empty() {
                    text.push(' ');
                }
                offset += 1;
            }
            if i >= first {
                if text.is_empty() {
                    start = offset;
                }
                text.push(c);
            }
            offset += 1;
        }
    }
    (start, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::{FATHA, KASRA, SHADDA, ZWNJ};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn highlights_trailing_syllables() {
        let entry = WordEntry::new("کاسِه", strings(&["کا", "سِه"]), strings(&["آ", "اِ"]));
        let span = phonemic_span(&entry, &strings(&["آ", "اِ"])).unwrap();
        assert_eq!(span, Span { start: 0, end: 5 });

        let span = phonemic_span(&entry, &strings(&["اِ"])).unwrap();
        assert_eq!(span.slice(entry.surface_form()), "سِه");
    }

    #[test]
    fn spaces_are_restored_inside_the_window() {
        let full = format!("کاسِه{ZWNJ}تُرمُز");
        let entry = WordEntry::new(
            &full,
            strings(&["کا", "سِه", "تُر", "مُز"]),
            strings(&["آ", "اِ", "اُ", "اُ"]),
        );
        let span = phonemic_span(&entry, &strings(&["اِ", "اُ"])).unwrap();
        assert_eq!(span.slice(entry.surface_form()), "سِه تُر");
        assert_eq!(span, Span { start: 2, end: 9 });
    }

    #[test]
    fn missing_run_has_no_span() {
        let entry = WordEntry::new("کاسِه", strings(&["کا", "سِه"]), strings(&["آ", "اِ"]));
        assert_eq!(phonemic_span(&entry, &strings(&["اُ"])), None);
    }

    #[test]
    fn window_missing_from_the_written_word_has_no_span() {
        // Doubled consonants make the syllables longer than the written word.
        let entry = WordEntry::new(
            &format!("بَچ{KASRA}{SHADDA}ه"),
            vec!["بَچ".to_string(), "چِه".to_string()],
            strings(&["اَ", "اِ"]),
        );
        assert_eq!(phonemic_span(&entry, &strings(&["اَ", "اِ"])), None);
    }

    #[test]
    fn trailing_span_counts_characters() {
        let entry = WordEntry::new("دَستَه", strings(&["دَس", "تَه"]), strings(&["اَ", "اَ"]));
        let span = trailing_span(&entry, 2).unwrap();
        assert_eq!(span.slice(entry.surface_form()), format!("{FATHA}ه"));
        assert_eq!(trailing_span(&entry, 0), None);
        assert_eq!(trailing_span(&entry, 99), None);
    }
}
