// File: src/core/nbest.rs
// N-best extraction over the recombination lattice.
//
// Every complete hypothesis seeds a path. Popping the best path spawns
// deviations that replace one of its edges by an arc recombined into that
// edge; everything before the deviation follows the arc's own history.

use crate::core::hypothesis::{HypothesisArena, HypothesisId};
use crate::core::options::TranslationOptionCollection;
use crate::core::score::{ScoreVector, Weights};
use crate::core::types::{Score, WordId};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;

/// One complete derivation through the lattice.
#[derive(Debug, Clone)]
pub struct TrellisPath {
    /// Final hypothesis first, root last.
    edges: Vec<HypothesisId>,
    /// Edges at or before this index were fixed by earlier deviations.
    prev_edge_changed: Option<usize>,
    scores: ScoreVector,
    total_score: Score,
    seq: u64,
}

impl TrellisPath {
    fn pure(arena: &HypothesisArena, last: HypothesisId, weights: &Weights, seq: u64) -> Self {
        let mut edges = arena.path(last);
        edges.reverse();
        let scores = arena.get(last).scores().clone();
        let total_score = scores.inner_product(weights);
        Self {
            edges,
            prev_edge_changed: None,
            scores,
            total_score,
            seq,
        }
    }

    fn deviate(
        &self,
        arena: &HypothesisArena,
        edge: usize,
        arc: HypothesisId,
        weights: &Weights,
        seq: u64,
    ) -> Self {
        let mut edges = self.edges[..edge].to_vec();
        edges.push(arc);
        let mut current = arena.get(arc).prev();
        while let Some(id) = current {
            edges.push(id);
            current = arena.get(id).prev();
        }

        let mut scores = self.scores.clone();
        scores.minus_assign(arena.get(self.edges[edge]).scores());
        scores.plus_assign(arena.get(arc).scores());
        let total_score = scores.inner_product(weights);
        Self {
            edges,
            prev_edge_changed: Some(edge),
            scores,
            total_score,
            seq,
        }
    }

    /// Hypotheses from the first translated phrase to the last, root
    /// excluded.
    pub fn hypotheses(&self) -> impl Iterator<Item = HypothesisId> + '_ {
        self.edges.iter().rev().skip(1).copied()
    }

    pub fn scores(&self) -> &ScoreVector {
        &self.scores
    }

    pub fn total_score(&self) -> Score {
        self.total_score
    }

    /// Target words in output order.
    pub fn surface(&self, arena: &HypothesisArena, options: &TranslationOptionCollection) -> Vec<WordId> {
        self.hypotheses()
            .filter_map(|id| arena.get(id).option())
            .flat_map(|option| options.get(option).target().iter().copied())
            .collect()
    }
}

/// Better paths sort later; equal scores prefer the older path.
fn rank(a: &TrellisPath, b: &TrellisPath) -> Ordering {
    a.total_score.total_cmp(&b.total_score).then(b.seq.cmp(&a.seq))
}

/// Candidate paths kept sorted so the best one pops off the end.
#[derive(Default)]
struct Contenders {
    paths: Vec<TrellisPath>,
}

impl Contenders {
    fn add(&mut self, path: TrellisPath) {
        let at = self.paths.partition_point(|p| rank(p, &path) == Ordering::Less);
        self.paths.insert(at, path);
    }

    fn pop(&mut self) -> Option<TrellisPath> {
        self.paths.pop()
    }

    fn prune(&mut self, keep: usize) {
        if self.paths.len() > keep {
            self.paths.drain(..self.paths.len() - keep);
        }
    }

    fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Parameters of one n-best extraction.
#[derive(Debug, Clone, Copy)]
pub struct NBestRequest {
    pub count: usize,
    pub distinct: bool,
    /// Already resolved: never 0.
    pub factor: usize,
}

/// Enumerates up to `request.count` derivations, best first.
///
/// `finals` are the survivors of the last stack. Iteration stops after
/// `count * factor` pops even if fewer paths were accepted, which bounds the
/// work spent in distinct mode on lattices full of duplicates.
pub fn extract(
    arena: &HypothesisArena,
    finals: &[HypothesisId],
    options: &TranslationOptionCollection,
    weights: &Weights,
    request: NBestRequest,
) -> Vec<TrellisPath> {
    let NBestRequest {
        count,
        distinct,
        factor,
    } = request;
    let mut seq = 0u64;
    let mut next_seq = || {
        seq += 1;
        seq
    };

    let mut contenders = Contenders::default();
    for &id in finals {
        contenders.add(TrellisPath::pure(arena, id, weights, next_seq()));
    }

    let mut accepted = Vec::new();
    let mut seen: FxHashSet<Vec<WordId>> = FxHashSet::default();
    let max_iterations = count.saturating_mul(factor);
    let mut iteration = 0;
    while accepted.len() < count && !contenders.is_empty() && iteration < max_iterations {
        iteration += 1;
        let Some(path) = contenders.pop() else {
            break;
        };

        let first_edge = path.prev_edge_changed.map_or(0, |edge| edge + 1);
        for edge in first_edge..path.edges.len() {
            for &arc in arena.get(path.edges[edge]).arcs() {
                contenders.add(path.deviate(arena, edge, arc, weights, next_seq()));
            }
        }

        if !distinct || seen.insert(path.surface(arena, options)) {
            accepted.push(path);
        }
        contenders.prune(if distinct {
            count.saturating_mul(factor)
        } else {
            count
        });
    }

    tracing::debug!(
        requested = count,
        produced = accepted.len(),
        iterations = iteration,
        "n-best extraction finished"
    );
    accepted
}
