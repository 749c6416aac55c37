// File: src/models/reordering.rs
use crate::core::reordering::{Orientation, ReorderingModel};
use crate::core::span::Span;
use crate::core::types::{Phrase, Score, WordId};
use crate::core::vocab::Vocabulary;
use rustc_hash::FxHashMap;

type PhrasePair = (Phrase, Phrase);

/// Monotone / swap / discontinuous orientation log-probabilities per
/// phrase pair. Each extension fills only the component of the orientation
/// that actually occurred.
#[derive(Debug, Clone)]
pub struct MsdReorderingTable {
    entries: FxHashMap<PhrasePair, [Score; Orientation::COUNT]>,
    /// Used for pairs missing from the table.
    default: [Score; Orientation::COUNT],
}

impl MsdReorderingTable {
    pub fn new(default: [Score; Orientation::COUNT]) -> Self {
        Self {
            entries: FxHashMap::default(),
            default,
        }
    }

    pub fn insert(&mut self, source: &[WordId], target: &[WordId], scores: [Score; Orientation::COUNT]) {
        let key = (source.iter().copied().collect(), target.iter().copied().collect());
        self.entries.insert(key, scores);
    }

    pub fn insert_text(
        &mut self,
        vocab: &Vocabulary,
        source: &str,
        target: &str,
        scores: [Score; Orientation::COUNT],
    ) {
        self.insert(&vocab.tokenize(source), &vocab.tokenize(target), scores);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn distribution(&self, source: &[WordId], target: &[WordId]) -> &[Score; Orientation::COUNT] {
        let key: PhrasePair = (source.iter().copied().collect(), target.iter().copied().collect());
        self.entries.get(&key).unwrap_or(&self.default)
    }
}

impl Default for MsdReorderingTable {
    /// Uniform over the three orientations.
    fn default() -> Self {
        Self::new([(1.0f32 / 3.0).ln(); Orientation::COUNT])
    }
}

impl ReorderingModel for MsdReorderingTable {
    fn num_scores(&self) -> usize {
        Orientation::COUNT
    }

    fn score(&self, prev: Option<Span>, curr: Span, source: &[WordId], target: &[WordId]) -> Vec<Score> {
        let orientation = Orientation::classify(prev, curr);
        let mut scores = vec![0.0; Orientation::COUNT];
        scores[orientation.index()] = self.distribution(source, target)[orientation.index()];
        scores
    }
}
