// File: src/models/phrase_table.rs
use crate::core::phrase_table::{PhraseCandidate, PhraseTable};
use crate::core::types::{cmp_desc, Score, WordId};
use crate::core::vocab::Vocabulary;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: FxHashMap<WordId, usize>,
    /// Ranked best first by the sum of raw scores.
    candidates: Vec<PhraseCandidate>,
}

/// A phrase table held in memory as a trie over source word ids.
///
/// Each node stands for one source phrase; walking a prefix that leads
/// nowhere is how `has_prefix` cuts long span lookups short.
#[derive(Debug, Clone)]
pub struct MemoryPhraseTable {
    nodes: Vec<TrieNode>,
    num_scores: usize,
    entries: usize,
}

impl MemoryPhraseTable {
    pub fn new(num_scores: usize) -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            num_scores,
            entries: 0,
        }
    }

    /// Adds one phrase pair. Candidates with equal estimates keep insertion
    /// order. O(k) in the source length plus the candidate list length.
    pub fn insert(&mut self, source: &[WordId], candidate: PhraseCandidate) {
        assert_eq!(
            candidate.scores.len(),
            self.num_scores,
            "phrase pair has the wrong number of scores"
        );
        let mut node_idx = 0;
        for &word in source {
            node_idx = match self.nodes[node_idx].children.get(&word) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node_idx].children.insert(word, next);
                    next
                }
            };
        }

        let score = estimate(&candidate);
        let list = &mut self.nodes[node_idx].candidates;
        let at = list.partition_point(|c| cmp_desc(estimate(c), score).is_le());
        list.insert(at, candidate);
        self.entries += 1;
    }

    /// Interns both sides through `vocab` and adds the pair.
    pub fn insert_text(&mut self, vocab: &Vocabulary, source: &str, target: &str, scores: Vec<Score>) {
        let source = vocab.tokenize(source);
        let candidate = PhraseCandidate {
            target: vocab.tokenize(target),
            scores,
        };
        self.insert(&source, candidate);
    }

    /// Number of phrase pairs.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    fn find(&self, source: &[WordId]) -> Option<&TrieNode> {
        let mut node_idx = 0;
        for word in source {
            node_idx = *self.nodes[node_idx].children.get(word)?;
        }
        Some(&self.nodes[node_idx])
    }
}

fn estimate(candidate: &PhraseCandidate) -> Score {
    candidate.scores.iter().sum()
}

impl PhraseTable for MemoryPhraseTable {
    fn num_scores(&self) -> usize {
        self.num_scores
    }

    fn lookup(&self, source: &[WordId]) -> Vec<PhraseCandidate> {
        self.find(source)
            .map(|node| node.candidates.clone())
            .unwrap_or_default()
    }

    fn has_prefix(&self, prefix: &[WordId]) -> bool {
        self.find(prefix).is_some()
    }
}
