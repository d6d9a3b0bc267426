// src/core/script.rs
//! Persian/Arabic-script character inventory shared by every analysis pass.

pub const FATHATAN: char = '\u{064b}';
pub const DAMMATAN: char = '\u{064c}';
pub const KASRATAN: char = '\u{064d}';
pub const FATHA: char = '\u{064e}';
pub const DAMMA: char = '\u{064f}';
pub const KASRA: char = '\u{0650}';
pub const SHADDA: char = '\u{0651}';
pub const SUKUN: char = '\u{0652}';

/// Zero-width non-joiner, the soft-compound marker ("nim-faseleh").
pub const ZWNJ: char = '\u{200c}';
const ZWJ: char = '\u{200d}';
const LRM: char = '\u{200e}';
const RLM: char = '\u{200f}';
const TATWEEL: char = '\u{0640}';

pub const ALEF: char = 'ا';
pub const ALEF_MADDA: char = 'آ';
const ALEF_HAMZA_ABOVE: char = 'أ';
const ALEF_HAMZA_BELOW: char = 'إ';
pub const WAW: char = 'و';
pub const YEH: char = 'ی';
pub const NOON: char = 'ن';

/// Delimiter used to join phonemes into the searchable phoneme string.
pub const PHONEME_DELIMITER: &str = ",";

/// Every mark the tokenizer attaches to the preceding base character.
pub fn is_diacritic(c: char) -> bool {
    matches!(
        c,
        FATHATAN | DAMMATAN | KASRATAN | FATHA | DAMMA | KASRA | SHADDA | SUKUN
    )
}

/// fatha, damma, kasra.
pub fn is_short_vowel(c: char) -> bool {
    matches!(c, FATHA | DAMMA | KASRA)
}

/// Letters that realise a long vowel (and double as consonants in context).
pub fn is_long_vowel(c: char) -> bool {
    matches!(c, ALEF | ALEF_MADDA | WAW | YEH)
}

/// Long or short vowel, the class used by professional rhyme comparison.
pub fn is_vowel_class(c: char) -> bool {
    is_long_vowel(c) || is_short_vowel(c)
}

pub fn is_glide(c: char) -> bool {
    matches!(c, WAW | YEH)
}

/// Graphemes able to carry the unwritten-but-spoken "A".
pub fn is_vowel_carrier(c: char) -> bool {
    matches!(
        c,
        WAW | YEH | ALEF | ALEF_MADDA | ALEF_HAMZA_ABOVE | ALEF_HAMZA_BELOW
    )
}

/// Characters skipped when looking for the nearest preceding base letter.
pub fn is_boundary(c: char) -> bool {
    matches!(c, ' ' | ZWNJ | ZWJ | LRM | RLM | TATWEEL)
}

/// Strip short vowels and the gemination mark, keeping every other character.
pub fn bare(s: &str) -> String {
    s.chars()
        .filter(|&c| !is_short_vowel(c) && c != SHADDA)
        .collect()
}

/// Replace soft-compound markers with plain spaces.
pub fn to_surface(s: &str) -> String {
    s.replace(ZWNJ, " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_keeps_sukun_and_letters() {
        let word = "دَرْس\u{0651}";
        assert_eq!(bare(word), "درْس");
    }

    #[test]
    fn surface_replaces_every_marker() {
        assert_eq!(to_surface("کاسه\u{200c}ترمز\u{200c}ها"), "کاسه ترمز ها");
    }

    #[test]
    fn vowel_class_covers_letters_and_marks() {
        assert!(is_vowel_class('ا'));
        assert!(is_vowel_class(KASRA));
        assert!(!is_vowel_class('ب'));
        assert!(!is_vowel_class(SUKUN));
    }
}
