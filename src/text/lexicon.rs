//! Fixed word tables for tokenization and synonym expansion.

use crate::config::LexiconConfig;
use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on", "with", "at", "by",
    "from", "as", "into", "through", "during", "before", "after", "above", "below", "between",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "just", "and", "but", "if", "or", "because",
    "until", "while", "although", "though", "this", "that", "these", "those", "i", "me", "my",
    "myself", "we", "our", "you", "your", "he", "him", "his", "she", "her", "it", "its", "they",
    "them", "their", "what", "which", "who", "whom", "use", "please",
];

/// Short forms kept verbatim even though they are two or three letters long
const ABBREVIATIONS: &[&str] = &[
    "pr", "mr", "ci", "cd", "ui", "db", "api", "sdk", "cli", "url", "id", "io", "ok", "qa", "js",
    "ts",
];

/// Each entry lists interchangeable terms; multi-word terms are allowed
const SYNONYMS: &[&[&str]] = &[
    &["pr", "pull request", "merge request", "mr"],
    &["pkg", "package"],
    &["scaffold", "generate", "bootstrap"],
    &["ci", "pipeline", "continuous integration"],
    &["db", "database"],
    &["repo", "repository"],
    &["doc", "documentation", "readme"],
    &["config", "configuration", "settings"],
    &["deploy", "release", "publish"],
    &["bug", "defect", "issue"],
    &["test", "spec"],
];

/// Immutable word tables, built once per process and handed to the
/// token engine and synonym expander.
#[derive(Debug, Clone)]
pub struct Lexicon {
    stop_words: HashSet<String>,
    abbreviations: HashSet<String>,
    synonyms: Vec<Vec<String>>,
}

impl Lexicon {
    /// Built-in tables only
    pub fn builtin() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            abbreviations: ABBREVIATIONS.iter().map(|w| w.to_string()).collect(),
            synonyms: SYNONYMS
                .iter()
                .map(|entry| entry.iter().map(|t| t.to_string()).collect())
                .collect(),
        }
    }

    /// Built-in tables extended with configured words
    pub fn with_config(config: &LexiconConfig) -> Self {
        let mut lexicon = Self::builtin();
        lexicon
            .stop_words
            .extend(config.stop_words.iter().map(|w| w.trim().to_lowercase()));
        lexicon.synonyms.extend(
            config
                .synonyms
                .iter()
                .filter(|entry| entry.len() > 1)
                .map(|entry| entry.iter().map(|t| t.trim().to_lowercase()).collect()),
        );
        lexicon
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    pub fn is_abbreviation(&self, word: &str) -> bool {
        self.abbreviations.contains(word)
    }

    /// Synonym entries as raw terms
    pub fn synonym_entries(&self) -> &[Vec<String>] {
        &self.synonyms
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}
