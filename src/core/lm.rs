// File: src/core/lm.rs
// Incremental language model interface.
//
// A model is consulted twice for every phrase: once when the translation
// option is built (`score_phrase`, no left context available) and once when
// the option extends a hypothesis (`score_continuation` or
// `score_from_scratch`), where only the n-grams reaching back into the
// previous phrase are scored.

use crate::core::types::{Score, WordId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Opaque language model context.
///
/// Two hypotheses with equal states receive identical scores for every
/// future continuation, so the state is part of the recombination key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LmState(SmallVec<[WordId; 4]>);

impl LmState {
    pub fn new(history: impl IntoIterator<Item = WordId>) -> Self {
        Self(history.into_iter().collect())
    }

    /// Context words, oldest first.
    pub fn history(&self) -> &[WordId] {
        &self.0
    }
}

/// Result of scoring words against a context.
#[derive(Debug, Clone, PartialEq)]
pub struct LmScore {
    pub log_prob: Score,
    pub state: LmState,
    /// Length of the longest n-gram the model matched for the last word.
    pub context_len: usize,
}

/// Score of a phrase scored in isolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhraseLmScore {
    /// n-grams lying completely inside the phrase.
    pub inner: Score,
    /// Lower-order estimate for the first `order - 1` words, whose real
    /// score depends on the preceding phrase.
    pub boundary_estimate: Score,
}

pub trait LanguageModel: Send + Sync {
    fn order(&self) -> usize;

    /// State right after the sentence-start marker.
    fn begin_state(&self) -> LmState;

    fn score_phrase(&self, words: &[WordId]) -> PhraseLmScore;

    /// Scores the first `order - 1` of `words` given `state`; the returned
    /// state reflects all of `words`.
    fn score_continuation(&self, words: &[WordId], state: &LmState) -> LmScore;

    /// Like `score_continuation`, with the sentence-start marker as context.
    fn score_from_scratch(&self, words: &[WordId]) -> LmScore {
        self.score_continuation(words, &self.begin_state())
    }

    /// Log-probability of the end-of-sentence marker after `state`.
    fn score_end(&self, state: &LmState) -> Score;
}
