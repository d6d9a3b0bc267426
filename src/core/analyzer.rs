// src/core/analyzer.rs
//! Grapheme-to-phoneme analysis: syllables ("heja") and phonemes ("ava").
//!
//! Each whitespace-separated token goes through three preparation passes
//! (soft-compound markers to spaces, tanwin to an explicit vowel + noon,
//! shadda to a doubled consonant), then a single left-to-right tagging pass
//! decides whether every long-vowel letter acts as a consonant or a vowel.
//! Syllables and phonemes are both read off the resulting nucleus list.

use crate::core::orthography::{join, tokenize, Grapheme};
use crate::core::script::{
    self, ALEF, ALEF_MADDA, DAMMA, DAMMATAN, FATHA, FATHATAN, KASRA, KASRATAN, NOON, SHADDA,
    SUKUN, WAW, YEH,
};
use tracing::trace;

/// Consonant/vowel role of a grapheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phone {
    Consonant,
    Vowel,
    Undetermined,
}

#[derive(Debug, Clone)]
struct Tagged {
    grapheme: Grapheme,
    phone: Phone,
}

impl Tagged {
    fn short_vowel(&self) -> Option<char> {
        self.grapheme.marks.chars().find(|&c| script::is_short_vowel(c))
    }

    /// Carries a vowel of its own: a vowel letter or a short-vowel mark.
    fn is_vowel_bearing(&self) -> bool {
        self.phone == Phone::Vowel || self.short_vowel().is_some()
    }
}

#[derive(Debug)]
struct Nucleus {
    /// Index of the grapheme that starts this nucleus' syllable.
    onset: usize,
    phoneme: String,
}

/// Syllables and phonemes derived from one pass over a word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    pub syllables: Vec<String>,
    pub phonemes: Vec<String>,
}

impl Analysis {
    /// Both sequences are non-empty.
    pub fn is_usable(&self) -> bool {
        !self.syllables.is_empty() && !self.phonemes.is_empty()
    }

    fn extend(&mut self, other: Analysis) {
        self.syllables.extend(other.syllables);
        self.phonemes.extend(other.phonemes);
    }
}

/// A deterministic, pure rule engine. Never fails: a word without any
/// vowel-bearing position comes back whole as a single syllable and phoneme.
#[derive(Debug, Clone, Copy)]
pub struct PhonemeAnalyzer;

impl PhonemeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyzes every token of `text` and concatenates the results in order.
    pub fn analyze(&self, text: &str) -> Analysis {
        let surface = script::to_surface(text);
        let mut out = Analysis::default();
        for token in surface.split_whitespace() {
            out.extend(self.analyze_token(token));
        }
        out
    }

    pub fn syllabify(&self, text: &str) -> Vec<String> {
        self.analyze(text).syllables
    }

    pub fn phonemes(&self, text: &str) -> Vec<String> {
        self.analyze(text).phonemes
    }

    fn analyze_token(&self, token: &str) -> Analysis {
        let tagged = tag(prepare(token));
        let nuclei = nuclei(&tagged);
        trace!(token, nuclei = nuclei.len(), "token analyzed");

        if nuclei.is_empty() {
            return Analysis {
                syllables: vec![token.to_string()],
                phonemes: vec![token.to_string()],
            };
        }

        let mut phonemes: Vec<String> = nuclei.iter().map(|n| n.phoneme.clone()).collect();
        if token.starts_with(ALEF_MADDA) {
            if let Some(first) = phonemes.first_mut() {
                *first = first.replacen(ALEF, &ALEF_MADDA.to_string(), 1);
            }
        }

        let syllables = if nuclei.len() < 2 {
            vec![token.to_string()]
        } else {
            syllables(&tagged, &nuclei)
        };

        Analysis { syllables, phonemes }
    }
}

impl Default for PhonemeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands tanwin into vowel + noon and shadda into a doubled consonant.
fn prepare(token: &str) -> Vec<Grapheme> {
    let mut out: Vec<Grapheme> = Vec::new();
    let graphemes = tokenize(token);
    let last = graphemes.len().saturating_sub(1);

    for (i, mut g) in graphemes.into_iter().enumerate() {
        if let Some(vowel) = take_tanwin(&mut g) {
            // Tanwin written on a seat alef: the vowel belongs to the letter before it.
            if g.base == ALEF && !out.is_empty() {
                let last_idx = out.len() - 1;
                let prev = &mut out[last_idx];
                prev.marks.retain(|c| !script::is_short_vowel(c));
                prev.marks.push(vowel);
            } else {
                g.marks.push(vowel);
                out.push(g);
            }
            out.push(Grapheme::bare(NOON));
            continue;
        }

        // A seat alef written after the tanwin letter ("ًا") is silent.
        if g.base == ALEF && g.marks.is_empty() && i == last {
            let follows_tanwin = out.len() >= 2
                && out[out.len() - 1] == Grapheme::bare(NOON)
                && out[out.len() - 2].has_mark(FATHA)
                && token.contains(FATHATAN);
            if follows_tanwin {
                continue;
            }
        }

        if g.has_mark(SHADDA) {
            g.marks.retain(|c| c != SHADDA);
            out.push(Grapheme::bare(g.base));
        }
        out.push(g);
    }
    out
}

fn take_tanwin(g: &mut Grapheme) -> Option<char> {
    let vowel = g.marks.chars().find_map(|c| match c {
        FATHATAN => Some(FATHA),
        DAMMATAN => Some(DAMMA),
        KASRATAN => Some(KASRA),
        _ => None,
    })?;
    g.marks
        .retain(|c| !matches!(c, FATHATAN | DAMMATAN | KASRATAN));
    Some(vowel)
}

fn bears_vowel(g: &Grapheme) -> bool {
    script::is_long_vowel(g.base) || g.marks.chars().any(script::is_short_vowel)
}

/// One left-to-right pass resolving every long-vowel letter. A glide between a
/// consonant and an alef (or a yeh before a closing waw) is doubled: the first
/// copy is the vowel, the inserted copy is the consonantal onset of the next
/// syllable.
fn tag(graphemes: Vec<Grapheme>) -> Vec<Tagged> {
    let mut out: Vec<Tagged> = Vec::with_capacity(graphemes.len() + 1);

    for (i, g) in graphemes.iter().enumerate() {
        let next = graphemes.get(i + 1);
        let has_short = g.marks.chars().any(script::is_short_vowel);

        let initial = if script::is_long_vowel(g.base) {
            Phone::Undetermined
        } else {
            Phone::Consonant
        };
        let mut insert_glide = false;

        let phone = match initial {
            Phone::Undetermined if g.base == ALEF_MADDA => Phone::Vowel,
            Phone::Undetermined if g.base == ALEF => {
                let seat_for_yeh = i == 0
                    && next.is_some_and(|n| n.base == YEH && n.marks.is_empty());
                if has_short || seat_for_yeh {
                    Phone::Consonant
                } else {
                    Phone::Vowel
                }
            }
            Phone::Undetermined => {
                let prev_bears_vowel = out.last().is_some_and(Tagged::is_vowel_bearing);
                if has_short || g.has_mark(SUKUN) || i == 0 || prev_bears_vowel {
                    Phone::Consonant
                } else {
                    insert_glide = g.marks.is_empty()
                        && next.is_some_and(|n| {
                            n.marks.is_empty()
                                && match n.base {
                                    ALEF | ALEF_MADDA => true,
                                    // A waw that opens a vowel of its own keeps the yeh whole.
                                    WAW if g.base == YEH => {
                                        !graphemes.get(i + 2).is_some_and(bears_vowel)
                                    }
                                    _ => false,
                                }
                        });
                    Phone::Vowel
                }
            }
            other => other,
        };

        out.push(Tagged { grapheme: g.clone(), phone });
        if insert_glide {
            out.push(Tagged {
                grapheme: Grapheme::bare(g.base),
                phone: Phone::Consonant,
            });
        }
    }
    out
}

fn nuclei(tagged: &[Tagged]) -> Vec<Nucleus> {
    let mut out = Vec::new();

    for (i, t) in tagged.iter().enumerate() {
        if let Some(vowel) = t.short_vowel() {
            let mut phoneme = format!("{ALEF}{vowel}");
            if let Some(glide) = coda_glide(tagged, i) {
                phoneme.push(glide);
            }
            out.push(Nucleus { onset: i, phoneme });
        } else if t.phone == Phone::Vowel {
            let phoneme = match t.grapheme.base {
                ALEF | ALEF_MADDA => ALEF_MADDA.to_string(),
                glide => format!("{ALEF}{glide}"),
            };
            let onset = match i.checked_sub(1).map(|p| &tagged[p]) {
                Some(prev) if prev.phone == Phone::Consonant && prev.short_vowel().is_none() => i - 1,
                _ => i,
            };
            out.push(Nucleus { onset, phoneme });
        }
    }
    out
}

/// A consonantal glide closing a short vowel forms a diphthong with it.
fn coda_glide(tagged: &[Tagged], i: usize) -> Option<char> {
    let next = tagged.get(i + 1)?;
    if !script::is_glide(next.grapheme.base) || next.phone != Phone::Consonant {
        return None;
    }
    if next.grapheme.marks.chars().any(script::is_short_vowel) {
        return None;
    }
    match tagged.get(i + 2) {
        Some(after) if after.is_vowel_bearing() => None,
        _ => Some(next.grapheme.base),
    }
}

fn syllables(tagged: &[Tagged], nuclei: &[Nucleus]) -> Vec<String> {
    let mut starts = vec![0];
    for n in &nuclei[1..] {
        if starts.last().is_some_and(|&s| n.onset > s) {
            starts.push(n.onset);
        }
    }

    let graphemes: Vec<Grapheme> = tagged.iter().map(|t| t.grapheme.clone()).collect();
    let mut out: Vec<String> = starts
        .iter()
        .enumerate()
        .map(|(k, &start)| {
            let end = starts.get(k + 1).copied().unwrap_or(graphemes.len());
            join(&graphemes[start..end])
        })
        .collect();

    // A syllable opened by a bare vocalic alef is written with madda.
    if tagged.first().is_some_and(|t| t.grapheme.base == ALEF && t.phone == Phone::Vowel) {
        if let Some(first) = out.first_mut() {
            *first = first.replacen(ALEF, &ALEF_MADDA.to_string(), 1);
        }
    }
    out
}
