//! Synonym expansion over stem sets.

use super::lexicon::Lexicon;
use super::tokens::{term_stems, StemSet};

/// One interchangeable term, as its stem sequence ("pull request" → [pull, request])
type Term = Vec<String>;

/// Widens stem sets with domain synonyms so that "PR" and "pull request"
/// compare as equal. Single pass, no transitive closure.
#[derive(Debug, Clone)]
pub struct SynonymExpander {
    entries: Vec<Vec<Term>>,
}

impl SynonymExpander {
    pub fn new(lexicon: &Lexicon) -> Self {
        let entries = lexicon
            .synonym_entries()
            .iter()
            .map(|entry| {
                entry
                    .iter()
                    .map(|term| term_stems(lexicon, term))
                    .filter(|stems| !stems.is_empty())
                    .collect::<Vec<Term>>()
            })
            .filter(|terms| terms.len() > 1)
            .collect();
        Self { entries }
    }

    /// Returns a superset of `stems`: for every entry with a term whose
    /// stems are all present, every stem of every term in that entry is added.
    pub fn expand(&self, stems: &StemSet) -> StemSet {
        let mut expanded = stems.clone();
        for entry in &self.entries {
            let matched = entry
                .iter()
                .any(|term| term.iter().all(|s| stems.contains(s)));
            if matched {
                expanded.extend(entry.iter().flatten().cloned());
            }
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TokenEngine;

    #[test]
    fn test_abbreviation_expands_to_phrase() {
        let lexicon = Lexicon::builtin();
        let engine = TokenEngine::new(&lexicon);
        let expander = SynonymExpander::new(&lexicon);

        let expanded = expander.expand(&engine.normalize("review my PR"));
        assert!(expanded.contains("pull"));
        assert!(expanded.contains("request"));
        assert!(expanded.contains("review"));
    }

    #[test]
    fn test_multi_word_term_requires_every_stem() {
        let lexicon = Lexicon::builtin();
        let engine = TokenEngine::new(&lexicon);
        let expander = SynonymExpander::new(&lexicon);

        // "request" alone is not "pull request"
        let expanded = expander.expand(&engine.normalize("send a request"));
        assert!(!expanded.contains("pr"));

        let expanded = expander.expand(&engine.normalize("open a pull request"));
        assert!(expanded.contains("pr"));
    }

    #[test]
    fn test_expansion_is_superset_and_deterministic() {
        let lexicon = Lexicon::builtin();
        let engine = TokenEngine::new(&lexicon);
        let expander = SynonymExpander::new(&lexicon);

        let base = engine.normalize("Generate the package database");
        let expanded = expander.expand(&base);
        assert!(base.is_subset(&expanded));
        assert!(expanded.contains("scaffold"));
        assert!(expanded.contains("pkg"));
        assert!(expanded.contains("db"));
        assert_eq!(expanded, expander.expand(&base));
    }

    #[test]
    fn test_no_match_leaves_set_unchanged() {
        let lexicon = Lexicon::builtin();
        let engine = TokenEngine::new(&lexicon);
        let expander = SynonymExpander::new(&lexicon);

        let base = engine.normalize("Rewrite git history and force push");
        assert_eq!(expander.expand(&base), base);
    }
}
