//! Text normalization used by the trigger analyzer.
//!
//! Phrases are reduced to sets of stems ([`tokens::TokenEngine`]) and then
//! widened with domain synonyms ([`synonyms::SynonymExpander`]). Both read
//! their tables from an explicit [`lexicon::Lexicon`].

pub mod lexicon;
pub mod synonyms;
pub mod tokens;

pub use lexicon::Lexicon;
pub use synonyms::SynonymExpander;
pub use tokens::{overlap, StemSet, TokenEngine};
