use crate::{language::Language, phonology::PhonemeSequence, symbols::SymbolTable};

/// Id interleaved between and around every element
pub const BLANK: i64 = 0;

/// A phone with no entry in the language's symbol table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized symbol")]
pub struct SymbolError {
    pub language: Language,
    pub symbol: String,
}

/// Interspersed id sequences, positionally aligned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSequences {
    pub phone_ids: Vec<i64>,
    pub tone_ids: Vec<i64>,
    pub lang_ids: Vec<i64>,
}

impl IdSequences {
    pub fn len(&self) -> usize {
        self.phone_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phone_ids.is_empty()
    }
}

/// Per-source-unit frame counts after interspersion. Not consumed by the
/// synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationAlignment(pub Vec<usize>);

impl DurationAlignment {
    pub fn from_word_counts(word_counts: &[usize]) -> Self {
        let mut counts: Vec<usize> = word_counts.iter().map(|n| n * 2).collect();
        if let Some(first) = counts.first_mut() {
            *first += 1;
        }
        Self(counts)
    }
}

/// `[a, b]` -> `[blank, a, blank, b, blank]`
pub fn intersperse<T: Clone>(items: &[T], blank: T) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len() * 2 + 1);
    out.push(blank.clone());
    for item in items {
        out.push(item.clone());
        out.push(blank.clone());
    }
    out
}

/// Map phones to ids and intersperse all three id sequences.
pub fn build(
    language: Language,
    seq: &PhonemeSequence,
    table: &SymbolTable,
) -> Result<IdSequences, SymbolError> {
    let phone_ids = seq
        .phones
        .iter()
        .map(|phone| {
            table.lookup(phone).ok_or_else(|| SymbolError {
                language,
                symbol: phone.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let lang_ids = vec![0i64; phone_ids.len()];

    Ok(IdSequences {
        phone_ids: intersperse(&phone_ids, BLANK),
        tone_ids: intersperse(&seq.tones, BLANK),
        lang_ids: intersperse(&lang_ids, BLANK),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{phonology::encode, symbols::PAD};

    #[test]
    fn test_intersperse_shape() {
        for n in 0..6 {
            let items: Vec<i64> = (1..=n).collect();
            let out = intersperse(&items, 0);
            assert_eq!(out.len(), 2 * n as usize + 1);
            for (i, v) in out.iter().enumerate() {
                if i % 2 == 0 {
                    assert_eq!(*v, 0);
                } else {
                    assert_eq!(*v, items[i / 2]);
                }
            }
        }
    }

    #[test]
    fn test_build_against_small_table() {
        let table = SymbolTable::from_symbols([PAD, "g", "o", "h"]).unwrap();
        let seq = encode(Language::Waitau, "go2 ho2").unwrap();
        let ids = build(Language::Waitau, &seq, &table).unwrap();

        assert_eq!(ids.phone_ids, vec![0, 0, 0, 1, 0, 2, 0, 3, 0, 2, 0, 0, 0]);
        assert_eq!(ids.tone_ids, vec![0, 0, 0, 2, 0, 2, 0, 2, 0, 2, 0, 0, 0]);
        assert_eq!(ids.lang_ids, vec![0; 13]);
    }

    #[test]
    fn test_missing_symbol_is_reported() {
        let table = SymbolTable::from_symbols([PAD, "g"]).unwrap();
        let seq = encode(Language::Waitau, "go2").unwrap();
        let err = build(Language::Waitau, &seq, &table).unwrap_err();
        assert_eq!(err.symbol, "o");
        assert_eq!(err.language, Language::Waitau);
    }

    #[test]
    fn test_builtin_tables_reject_unknown_phones() {
        let seq = encode(Language::Waitau, "xyz1").unwrap();
        let err = build(Language::Waitau, &seq, SymbolTable::builtin(Language::Waitau)).unwrap_err();
        assert_eq!(err.symbol, "xyz");
    }

    #[test]
    fn test_builtin_tables_cover_common_syllables() {
        let seq = encode(Language::Waitau, "go2 ho2 , ngo5 hai6 wai4 tau4 jan4 .").unwrap();
        assert!(build(Language::Waitau, &seq, SymbolTable::builtin(Language::Waitau)).is_ok());

        let seq = encode(Language::Hakka, "ngai2 he5 hak1 ka1 ngin2 , kiau1 jit5 !").unwrap();
        assert!(build(Language::Hakka, &seq, SymbolTable::builtin(Language::Hakka)).is_ok());
    }

    #[test]
    fn test_duration_alignment() {
        let DurationAlignment(counts) = DurationAlignment::from_word_counts(&[1, 2, 2, 1]);
        assert_eq!(counts, vec![3, 4, 4, 2]);
        // Sums to the interspersed length 2 * 6 + 1.
        assert_eq!(counts.iter().sum::<usize>(), 13);
    }
}
