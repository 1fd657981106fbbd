//! Phrase normalization: lower-case, strip punctuation, drop stop words, stem.

use super::lexicon::Lexicon;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// Sorted set of stems. Sorted so that reports list terms deterministically.
pub type StemSet = BTreeSet<String>;

/// Words at or below this length are never stemmed
const MIN_STEMMABLE_LEN: usize = 3;
/// No rule may leave a stem shorter than this
const MIN_STEM_LEN: usize = 3;
/// Non-abbreviation tokens at or below this length are dropped
const MAX_DROPPED_LEN: usize = 2;
/// Two-letter abbreviations whose plural is unambiguous ("mrs" is a title)
const SHORT_PLURAL_ABBREVIATIONS: &[&str] = &["prs", "dbs", "ids", "uis"];

/// Normalizes phrases into stem sets, memoizing per distinct input.
///
/// One engine is created per run; the memo table never outlives it.
pub struct TokenEngine<'a> {
    lexicon: &'a Lexicon,
    memo: RefCell<HashMap<String, StemSet>>,
}

impl<'a> TokenEngine<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Reduce a phrase to its stem set
    pub fn normalize(&self, phrase: &str) -> StemSet {
        if let Some(hit) = self.memo.borrow().get(phrase) {
            return hit.clone();
        }
        let stems = self.compute(phrase);
        self.memo
            .borrow_mut()
            .insert(phrase.to_string(), stems.clone());
        stems
    }

    /// Number of distinct phrases normalized so far
    pub fn memo_len(&self) -> usize {
        self.memo.borrow().len()
    }

    fn compute(&self, phrase: &str) -> StemSet {
        let mut stems = StemSet::new();
        for word in words(phrase) {
            if self.lexicon.is_stop_word(&word) {
                continue;
            }
            if let Some(abbrev) = self.abbreviation(&word) {
                stems.insert(abbrev);
                continue;
            }
            if word.chars().count() <= MAX_DROPPED_LEN {
                continue;
            }
            stems.insert(stem(&word));
        }
        stems
    }

    /// Abbreviations, including plurals like "prs" and "apis"
    fn abbreviation(&self, word: &str) -> Option<String> {
        if self.lexicon.is_abbreviation(word) {
            return Some(word.to_string());
        }
        word.strip_suffix('s')
            .filter(|base| char_len(base) >= 3 || SHORT_PLURAL_ABBREVIATIONS.contains(&word))
            .filter(|base| self.lexicon.is_abbreviation(base))
            .map(str::to_string)
    }
}

/// Stems of a synonym-table term, without stop-word filtering
pub fn term_stems(lexicon: &Lexicon, term: &str) -> Vec<String> {
    words(term)
        .map(|word| {
            if lexicon.is_abbreviation(&word) {
                word
            } else {
                stem(&word)
            }
        })
        .collect()
}

/// Lower-cased alphanumeric runs
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Rule-based suffix stripping.
///
/// Rules, first match wins: `ies`→`y`, `sses`→`ss`, `es` after a sibilant,
/// `eed`, `ing`, `ed`, then a plain `s`. `ing` and `ed` only come off a base
/// with a vowel, so "speed" and "string" survive. Afterwards a trailing silent `e` is
/// dropped so that "write", "writes" and "writing" agree.
pub fn stem(word: &str) -> String {
    if char_len(word) <= MIN_STEMMABLE_LEN {
        return word.to_string();
    }
    drop_silent_e(strip_inflection(word))
}

fn strip_inflection(word: &str) -> String {
    if let Some(base) = word.strip_suffix("ies") {
        if char_len(base) >= 2 {
            return format!("{}y", base);
        }
    }
    if let Some(base) = word.strip_suffix("sses") {
        return format!("{}ss", base);
    }
    if let Some(base) = word.strip_suffix("es") {
        let sibilant = ["s", "x", "z", "ch", "sh"].iter().any(|s| base.ends_with(s));
        if sibilant && char_len(base) >= MIN_STEM_LEN {
            return base.to_string();
        }
    }
    if let Some(base) = word.strip_suffix("eed") {
        return if has_vowel(base) {
            format!("{}ee", base)
        } else {
            word.to_string()
        };
    }
    if let Some(base) = word.strip_suffix("ing") {
        if char_len(base) >= MIN_STEM_LEN && has_vowel(base) {
            return undouble(base);
        }
    }
    if let Some(base) = word.strip_suffix("ed") {
        if char_len(base) >= MIN_STEM_LEN && has_vowel(base) {
            return undouble(base);
        }
    }
    if let Some(base) = word.strip_suffix('s') {
        let keeps_s = base.ends_with('s') || base.ends_with('u') || base.ends_with('i');
        if !keeps_s && char_len(base) >= MIN_STEM_LEN {
            return base.to_string();
        }
    }
    word.to_string()
}

/// "running" → "run", but "filling" keeps its double l
fn undouble(base: &str) -> String {
    let mut rev = base.chars().rev();
    match (rev.next(), rev.next()) {
        (Some(last), Some(prev))
            if last == prev && !"aeioulsz".contains(last) && char_len(base) > MIN_STEM_LEN =>
        {
            base[..base.len() - last.len_utf8()].to_string()
        }
        _ => base.to_string(),
    }
}

fn drop_silent_e(mut word: String) -> String {
    if word.ends_with('e') && !word.ends_with("ee") && char_len(&word) > MIN_STEM_LEN {
        word.pop();
    }
    word
}

fn has_vowel(s: &str) -> bool {
    s.chars().any(|c| "aeiouy".contains(c))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Jaccard overlap `|a ∩ b| / |a ∪ b|`; 0.0 when both sets are empty.
pub fn overlap(a: &StemSet, b: &StemSet) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / union as f64
}
