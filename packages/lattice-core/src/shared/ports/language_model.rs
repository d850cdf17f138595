//! Language model port
//!
//! Context slices are ordered most-recent word first: for the trigram
//! `u w x`, the probability of `x` is `word_prob(x, &[w, u])`.

use crate::shared::models::WordId;
use crate::shared::utils::log_prob::LogP;

pub trait LanguageModel {
    /// Highest n-gram order the model holds
    fn order(&self) -> usize;

    /// log10 P(word | context)
    fn word_prob(&self, word: WordId, context: &[WordId]) -> LogP;

    /// How many leading words of `context` can influence any future
    /// prediction. Words beyond this length only contribute back-off weights.
    fn context_length_used(&self, context: &[WordId]) -> usize;

    /// Back-off weight attached to exactly this context
    fn backoff_weight(&self, context: &[WordId]) -> LogP;

    /// Total back-off weight paid when `context` is truncated to `keep` words
    fn truncation_weight(&self, context: &[WordId], keep: usize) -> LogP {
        (keep + 1..=context.len())
            .map(|len| self.backoff_weight(&context[..len]))
            .sum()
    }
}
