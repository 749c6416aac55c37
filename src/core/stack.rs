// File: src/core/stack.rs
// One search stack: the hypotheses covering exactly `k` source words.

use crate::core::hypothesis::{Hypothesis, HypothesisArena, HypothesisId, RecombinationKey};
use crate::core::types::{cmp_desc, Score};
use rustc_hash::FxHashMap;

/// What happened to a hypothesis offered to a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First hypothesis with its recombination key.
    Added(HypothesisId),
    /// Beat the hypothesis holding its key and took its place.
    Replaced {
        winner: HypothesisId,
        loser: HypothesisId,
    },
    /// Lost to the hypothesis holding its key. The loser is only kept (as an
    /// arc of the winner) while n-best tracking is on.
    Recombined {
        winner: HypothesisId,
        loser: Option<HypothesisId>,
    },
    /// Scored `-inf`, or fell outside the beam on arrival with a key new to
    /// the stack while arcs are not kept.
    Discarded,
}

pub struct HypothesisStack {
    /// Retained hypotheses in insertion order. A replaced hypothesis hands
    /// its slot to the winner.
    entries: Vec<HypothesisId>,
    index: FxHashMap<RecombinationKey, usize>,
    best: Score,
    beam_threshold: Score,
    keep_arcs: bool,
    with_reordering: bool,
}

impl HypothesisStack {
    pub fn new(beam_threshold: Score, keep_arcs: bool, with_reordering: bool) -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
            best: Score::NEG_INFINITY,
            beam_threshold,
            keep_arcs,
            with_reordering,
        }
    }

    pub fn insert(&mut self, arena: &mut HypothesisArena, hypothesis: Hypothesis) -> InsertOutcome {
        let score = hypothesis.total_score();
        if score == Score::NEG_INFINITY {
            return InsertOutcome::Discarded;
        }

        // A held key always recombines. With arcs kept nothing is dropped on
        // arrival; `prune` applies the beam.
        let key = hypothesis.recombination_key(self.with_reordering);
        let Some(&slot) = self.index.get(&key) else {
            if !self.keep_arcs && score < self.best - self.beam_threshold {
                return InsertOutcome::Discarded;
            }
            let id = arena.alloc(hypothesis);
            self.index.insert(key, self.entries.len());
            self.entries.push(id);
            self.best = self.best.max(score);
            return InsertOutcome::Added(id);
        };

        let existing = self.entries[slot];
        // Ties go to the hypothesis that arrived first.
        if score > arena.get(existing).total_score() {
            let id = arena.alloc(hypothesis);
            self.entries[slot] = id;
            if self.keep_arcs {
                arena.add_arc(id, existing);
            }
            self.best = self.best.max(score);
            InsertOutcome::Replaced {
                winner: id,
                loser: existing,
            }
        } else {
            let loser = self.keep_arcs.then(|| {
                let id = arena.alloc(hypothesis);
                arena.add_arc(existing, id);
                id
            });
            InsertOutcome::Recombined {
                winner: existing,
                loser,
            }
        }
    }

    /// Threshold then histogram pruning. Returns how many hypotheses were
    /// dropped. Survivors keep their insertion order.
    pub fn prune(&mut self, arena: &HypothesisArena, max_size: usize) -> usize {
        let before = self.entries.len();
        let floor = self.best - self.beam_threshold;
        let mut ranked: Vec<(usize, HypothesisId)> = self
            .entries
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, id)| arena.get(id).total_score() >= floor)
            .collect();
        if max_size > 0 && ranked.len() > max_size {
            ranked.sort_by(|a, b| {
                cmp_desc(arena.get(a.1).total_score(), arena.get(b.1).total_score())
                    .then_with(|| a.0.cmp(&b.0))
            });
            ranked.truncate(max_size);
            ranked.sort_by_key(|&(slot, _)| slot);
        }
        if ranked.len() == before {
            return 0;
        }

        self.entries = ranked.into_iter().map(|(_, id)| id).collect();
        self.index.clear();
        for (slot, &id) in self.entries.iter().enumerate() {
            let key = arena.get(id).recombination_key(self.with_reordering);
            self.index.insert(key, slot);
        }
        before - self.entries.len()
    }

    /// Caps the arc list of every survivor at `limit`.
    pub fn cleanup_arcs(&self, arena: &mut HypothesisArena, limit: usize) {
        for &id in &self.entries {
            arena.truncate_arcs(id, limit);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best score seen since the stack was created, pruned or not.
    pub fn best_score(&self) -> Score {
        self.best
    }

    pub fn iter(&self) -> impl Iterator<Item = HypothesisId> + '_ {
        self.entries.iter().copied()
    }

    /// Highest-scoring survivor; earliest wins ties.
    pub fn best(&self, arena: &HypothesisArena) -> Option<HypothesisId> {
        self.ranked(arena).into_iter().next()
    }

    /// Survivors sorted best first, ties by insertion order.
    pub fn ranked(&self, arena: &HypothesisArena) -> Vec<HypothesisId> {
        let mut ranked: Vec<(usize, HypothesisId)> =
            self.entries.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| {
            cmp_desc(arena.get(a.1).total_score(), arena.get(b.1).total_score())
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.into_iter().map(|(_, id)| id).collect()
    }
}
