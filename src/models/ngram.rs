// File: src/models/ngram.rs
use crate::core::lm::{LanguageModel, LmScore, LmState, PhraseLmScore};
use crate::core::types::{Score, WordId};
use crate::core::vocab::{Vocabulary, BOS_ID, EOS_ID};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

type Ngram = SmallVec<[WordId; 4]>;

/// Log-probabilities assumed for words the model has never seen.
pub const DEFAULT_UNKNOWN_LOG_PROB: Score = -10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct NgramEntry {
    log_prob: Score,
    backoff: Score,
}

/// An in-memory back-off n-gram model (natural-log domain).
///
/// Contexts are trimmed to the longest suffix the model knows, so two
/// histories that differ only in words the model would back off over share
/// one state and can recombine.
#[derive(Debug, Clone)]
pub struct BackoffLm {
    order: usize,
    ngrams: FxHashMap<Ngram, NgramEntry>,
    unknown_log_prob: Score,
}

impl BackoffLm {
    pub fn new(order: usize) -> Self {
        assert!(order >= 1, "n-gram order must be at least 1");
        Self {
            order,
            ngrams: FxHashMap::default(),
            unknown_log_prob: DEFAULT_UNKNOWN_LOG_PROB,
        }
    }

    pub fn with_unknown_log_prob(mut self, log_prob: Score) -> Self {
        self.unknown_log_prob = log_prob;
        self
    }

    /// Adds or replaces an n-gram. Longer n-grams than the order are ignored.
    pub fn insert(&mut self, words: &[WordId], log_prob: Score, backoff: Score) {
        if words.is_empty() || words.len() > self.order {
            return;
        }
        self.ngrams
            .insert(words.iter().copied().collect(), NgramEntry { log_prob, backoff });
    }

    pub fn insert_text(&mut self, vocab: &Vocabulary, words: &str, log_prob: Score, backoff: Score) {
        self.insert(&vocab.tokenize(words), log_prob, backoff);
    }

    pub fn len(&self) -> usize {
        self.ngrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ngrams.is_empty()
    }

    /// `log p(word | context)` with back-off, and the length of the n-gram
    /// that matched (0 for an unknown word).
    fn word_prob(&self, context: &[WordId], word: WordId) -> (Score, usize) {
        let max_context = context.len().min(self.order - 1);
        let mut backoff = 0.0;
        let mut key: Ngram = SmallVec::with_capacity(max_context + 1);
        for n in (0..=max_context).rev() {
            let history = &context[context.len() - n..];
            key.clear();
            key.extend_from_slice(history);
            key.push(word);
            if let Some(entry) = self.ngrams.get(&key) {
                return (entry.log_prob + backoff, n + 1);
            }
            if n > 0 {
                if let Some(entry) = self.ngrams.get(history) {
                    backoff += entry.backoff;
                }
            }
        }
        (self.unknown_log_prob + backoff, 0)
    }

    /// Last `order - 1` words of `history`, minus leading words no known
    /// n-gram starts with.
    fn state_for(&self, history: &[WordId]) -> LmState {
        let keep = history.len().min(self.order - 1);
        let mut context = &history[history.len() - keep..];
        while !context.is_empty() && !self.ngrams.contains_key(context) {
            context = &context[1..];
        }
        LmState::new(context.iter().copied())
    }
}

impl LanguageModel for BackoffLm {
    fn order(&self) -> usize {
        self.order
    }

    fn begin_state(&self) -> LmState {
        self.state_for(&[BOS_ID])
    }

    fn score_phrase(&self, words: &[WordId]) -> PhraseLmScore {
        let boundary = self.order - 1;
        let mut inner = 0.0;
        let mut boundary_estimate = 0.0;
        for (i, &word) in words.iter().enumerate() {
            let (log_prob, _) = self.word_prob(&words[..i], word);
            if i < boundary {
                boundary_estimate += log_prob;
            } else {
                inner += log_prob;
            }
        }
        PhraseLmScore {
            inner,
            boundary_estimate,
        }
    }

    fn score_continuation(&self, words: &[WordId], state: &LmState) -> LmScore {
        let mut history: SmallVec<[WordId; 16]> = state.history().iter().copied().collect();
        let mut log_prob = 0.0;
        let mut context_len = 0;
        for (i, &word) in words.iter().enumerate() {
            if i < self.order - 1 {
                let (word_log_prob, matched) = self.word_prob(&history, word);
                log_prob += word_log_prob;
                context_len = matched;
            }
            history.push(word);
        }
        LmScore {
            log_prob,
            state: self.state_for(&history),
            context_len,
        }
    }

    fn score_end(&self, state: &LmState) -> Score {
        self.word_prob(state.history(), EOS_ID).0
    }
}
