//! Romanized syllables -> phone, tone and word-count sequences.
//!
//! A syllable is split at its vowel nucleus into an initial and a final.
//! Waitau emits `[initial, final]`; Hakka inserts a medial glide between
//! them, emitting `[initial, medial, final]`. The trailing character of every
//! multi-character syllable is its tone, a base-7 digit.

use crate::{language::Language, symbols::PAD};

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', 'ä', 'ö', 'ü', 'æ'];

/// Onset consonant that forces the Hakka `i` medial.
const GLIDE_TRIGGER: &str = "j";
/// Hakka medial placeholder when there is no glide.
const NO_MEDIAL: &str = "#";
const GLIDE: &str = "i";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{syllable}' does not end with tone 0~6")]
pub struct ToneError {
    pub syllable: String,
}

/// Parallel phone / tone / word-count sequences of one utterance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhonemeSequence {
    pub phones: Vec<String>,
    pub tones: Vec<i64>,
    /// Number of phones each source unit expanded into
    pub word_counts: Vec<usize>,
}

impl PhonemeSequence {
    fn push_unit(&mut self, phones: Vec<(String, i64)>) {
        self.word_counts.push(phones.len());
        for (phone, tone) in phones {
            self.phones.push(phone);
            self.tones.push(tone);
        }
    }

    pub fn len(&self) -> usize {
        self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }
}

/// Per-language syllable decomposition
trait Decompose {
    fn decompose(&self, syllable: &[char], tone: i64) -> Vec<(String, i64)>;
}

struct WaitauRules;
struct HakkaRules;

impl Decompose for WaitauRules {
    fn decompose(&self, syllable: &[char], tone: i64) -> Vec<(String, i64)> {
        let body = &syllable[..syllable.len() - 1];
        let nucleus = find_vowel(body, 0).unwrap_or(0);
        vec![
            (collect(&body[..nucleus]), tone),
            (collect(&body[nucleus..]), tone),
        ]
    }
}

impl Decompose for HakkaRules {
    fn decompose(&self, syllable: &[char], tone: i64) -> Vec<(String, i64)> {
        let body = &syllable[..syllable.len() - 1];
        let nucleus = find_vowel(body, 0).unwrap_or(0);
        let initial = collect(&body[..nucleus]);

        let mut glide = initial == GLIDE_TRIGGER;
        let mut final_start = nucleus;
        // An `i` nucleus followed by another vowel is really the glide.
        if body.get(nucleus) == Some(&'i') {
            if let Some(next) = find_vowel(body, nucleus + 1) {
                final_start = next;
                glide = true;
            }
        }

        let medial = if glide {
            (GLIDE.to_string(), tone)
        } else {
            (NO_MEDIAL.to_string(), 0)
        };
        vec![(initial, tone), medial, (collect(&body[final_start..]), tone)]
    }
}

fn find_vowel(chars: &[char], from: usize) -> Option<usize> {
    chars
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, c)| VOWELS.contains(c))
        .map(|(i, _)| i)
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn rules(language: Language) -> &'static dyn Decompose {
    match language {
        Language::Waitau => &WaitauRules,
        Language::Hakka => &HakkaRules,
    }
}

/// Encode whitespace-separated syllables, framed by the boundary pad.
pub fn encode(language: Language, text: &str) -> Result<PhonemeSequence, ToneError> {
    let rules = rules(language);
    let mut seq = PhonemeSequence::default();
    seq.push_unit(vec![(PAD.to_string(), 0)]);

    for syllable in text.split_whitespace() {
        let chars: Vec<char> = syllable.chars().collect();
        if chars.len() == 1 {
            seq.push_unit(vec![(syllable.to_string(), 0)]);
            continue;
        }
        let tone = chars
            .last()
            .and_then(|c| c.to_digit(7))
            .ok_or_else(|| ToneError {
                syllable: syllable.to_string(),
            })?;
        seq.push_unit(rules.decompose(&chars, tone as i64));
    }

    seq.push_unit(vec![(PAD.to_string(), 0)]);
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phones(seq: &PhonemeSequence) -> Vec<&str> {
        seq.phones.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_waitau_go2_ho2() {
        let seq = encode(Language::Waitau, "go2 ho2").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "g", "o", "h", "o", PAD]);
        assert_eq!(seq.tones, vec![0, 2, 2, 2, 2, 0]);
        assert_eq!(seq.word_counts, vec![1, 2, 2, 1]);
    }

    #[test]
    fn test_single_character_units_are_verbatim() {
        for lang in Language::ALL {
            let seq = encode(lang, "ngo5 , a").unwrap();
            let n = seq.len();
            assert_eq!(seq.phones[n - 3], ",");
            assert_eq!(seq.phones[n - 2], "a");
            assert_eq!(&seq.tones[n - 3..n - 1], &[0, 0]);
            assert_eq!(&seq.word_counts[seq.word_counts.len() - 3..seq.word_counts.len() - 1], &[1, 1]);
        }
    }

    #[test]
    fn test_tone_digits_zero_to_six_are_accepted() {
        for d in 0..=6 {
            let seq = encode(Language::Waitau, &format!("sam{d}")).unwrap();
            assert_eq!(seq.tones[1], d);
            assert_eq!(seq.tones[2], d);
        }
    }

    #[test]
    fn test_invalid_tone_is_a_tone_error() {
        for bad in ["pit8", "pit7", "sam9", "ngo", "ho?"] {
            let err = encode(Language::Hakka, bad).unwrap_err();
            assert_eq!(err.syllable, bad);
        }
        let err = encode(Language::Hakka, "pit8").unwrap_err();
        assert_eq!(err.to_string(), "'pit8' does not end with tone 0~6");
    }

    #[test]
    fn test_waitau_zero_onset_and_syllabic_nasal() {
        let seq = encode(Language::Waitau, "ai3 ng4").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "", "ai", "", "ng", PAD]);
        assert_eq!(seq.tones, vec![0, 3, 3, 4, 4, 0]);
    }

    #[test]
    fn test_hakka_placeholder_medial_has_tone_zero() {
        let seq = encode(Language::Hakka, "pit5").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "p", "#", "it", PAD]);
        assert_eq!(seq.tones, vec![0, 5, 0, 5, 0]);
        assert_eq!(seq.word_counts, vec![1, 3, 1]);
    }

    #[test]
    fn test_hakka_glide_trigger_initial() {
        let seq = encode(Language::Hakka, "jan2").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "j", "i", "an", PAD]);
        assert_eq!(seq.tones, vec![0, 2, 2, 2, 0]);
    }

    #[test]
    fn test_hakka_i_nucleus_followed_by_vowel_becomes_medial() {
        let seq = encode(Language::Hakka, "kiau1").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "k", "i", "au", PAD]);
        assert_eq!(seq.tones, vec![0, 1, 1, 1, 0]);

        // A lone `i` nucleus stays in the final.
        let seq = encode(Language::Hakka, "kin1").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "k", "#", "in", PAD]);
    }

    #[test]
    fn test_hakka_j_with_i_nucleus() {
        let seq = encode(Language::Hakka, "jiu3").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "j", "i", "u", PAD]);
        let seq = encode(Language::Hakka, "ji3").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "j", "i", "i", PAD]);
    }

    #[test]
    fn test_non_ascii_vowels() {
        let seq = encode(Language::Waitau, "hün1 zæk3").unwrap();
        assert_eq!(phones(&seq), vec![PAD, "h", "ün", "z", "æk", PAD]);
    }

    #[test]
    fn test_empty_text_is_just_padding() {
        let seq = encode(Language::Waitau, "   ").unwrap();
        assert_eq!(phones(&seq), vec![PAD, PAD]);
        assert_eq!(seq.word_counts, vec![1, 1]);
    }

    #[test]
    fn test_unit_counts_per_language() {
        let w = encode(Language::Waitau, "gwong2 dung1 wa6").unwrap();
        assert_eq!(w.len(), 2 + 3 * 2);
        let h = encode(Language::Hakka, "gwong2 dung1 wa6").unwrap();
        assert_eq!(h.len(), 2 + 3 * 3);
    }
}
