// File: src/core/hypothesis.rs
// Search graph nodes and the per-sentence arena that owns them.
//
// Hypotheses reference their parent by arena index. The arena lives exactly
// as long as one sentence's search and is dropped in one piece afterwards;
// results are copied out before that.

use crate::core::bitmap::CoverageBitmap;
use crate::core::features::FeatureSet;
use crate::core::lm::LmState;
use crate::core::options::{OptionId, TranslationOption, TranslationOptionCollection};
use crate::core::score::ScoreVector;
use crate::core::span::{distortion_distance, Span};
use crate::core::types::Score;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Stable index of a hypothesis within its sentence's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HypothesisId(u32);

impl HypothesisId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Everything that decides how a hypothesis scores from here on. Hypotheses
/// with equal keys are interchangeable for the rest of the search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecombinationKey {
    coverage: CoverageBitmap,
    lm_states: SmallVec<[Option<LmState>; 2]>,
    last_end: Option<usize>,
    reordering: Option<Span>,
}

#[derive(Debug, Clone)]
pub struct Hypothesis {
    prev: Option<HypothesisId>,
    option: Option<OptionId>,
    coverage: CoverageBitmap,
    last_span: Option<Span>,
    /// One entry per language model; `None` until the model has seen a word.
    lm_states: SmallVec<[Option<LmState>; 2]>,
    /// Cumulative from the root.
    scores: ScoreVector,
    future_score: Score,
    total_score: Score,
    arcs: Vec<HypothesisId>,
}

/// Per-extension inputs shared by every hypothesis of a sentence.
pub struct Scorer<'a> {
    pub features: &'a FeatureSet,
    pub options: &'a TranslationOptionCollection,
    pub early_distortion_cost: bool,
}

impl Hypothesis {
    /// Empty translation with nothing covered.
    pub fn root(scorer: &Scorer<'_>) -> Self {
        let coverage = CoverageBitmap::new(scorer.options.sentence_len());
        let future_score = scorer.options.future_costs().estimate(&coverage);
        Self {
            prev: None,
            option: None,
            coverage,
            last_span: None,
            lm_states: smallvec::smallvec![None; scorer.features.models.language_models.len()],
            scores: scorer.features.layout.zeros(),
            future_score,
            total_score: future_score,
            arcs: Vec::new(),
        }
    }

    /// Applies `option` to `parent` and scores the result.
    ///
    /// Panics if the option overlaps the parent's coverage.
    pub fn extend(
        parent_id: HypothesisId,
        parent: &Hypothesis,
        option_id: OptionId,
        option: &TranslationOption,
        scorer: &Scorer<'_>,
    ) -> Self {
        let features = scorer.features;
        let layout = &features.layout;
        let producers = &features.producers;
        let span = option.span();
        let target = option.target();

        let coverage = parent.coverage.with_span(span);
        let complete = coverage.is_complete();

        let mut scores = parent.scores.clone();
        scores.plus_assign(option.scores());

        let distortion = if scorer.early_distortion_cost {
            early_distortion_cost(parent.last_span, span, parent.coverage.first_gap())
        } else {
            -(distortion_distance(parent.last_span, span) as Score)
        };
        scores.add(layout, producers.distortion, 0, distortion);
        scores.add(layout, producers.word_penalty, 0, -(target.len() as Score));

        let mut lm_states = SmallVec::with_capacity(parent.lm_states.len());
        for ((lm, &producer), state) in features
            .models
            .language_models
            .iter()
            .zip(&producers.language_models)
            .zip(&parent.lm_states)
        {
            let mut scored_words = target.len().min(lm.order().saturating_sub(1));
            let (mut log_prob, next) = match state {
                Some(state) => {
                    let scored = lm.score_continuation(target, state);
                    (scored.log_prob, Some(scored.state))
                }
                None if target.is_empty() => (0.0, None),
                None => {
                    let scored = lm.score_from_scratch(target);
                    (scored.log_prob, Some(scored.state))
                }
            };
            if complete {
                let end_state = next.clone().unwrap_or_else(|| lm.begin_state());
                log_prob += lm.score_end(&end_state);
                scored_words += 1;
            }
            scores.add(layout, producer, 0, features.floor(log_prob, scored_words));
            lm_states.push(next);
        }

        if let (Some(model), Some(producer)) = (&features.models.reordering, producers.reordering) {
            let source = &scorer.options.source()[span.start()..=span.end()];
            let raw = model.score(parent.last_span, span, source, target);
            let floored: Vec<Score> = raw.iter().map(|&s| features.floor(s, 1)).collect();
            scores.add_slice(layout, producer, &floored);
        }

        let future_score = scorer.options.future_costs().estimate(&coverage);
        let total_score = scores.inner_product(&features.weights) + future_score;

        tracing::trace!(
            parent = parent_id.0,
            %span,
            coverage = ?coverage,
            total_score,
            "extended hypothesis"
        );

        Self {
            prev: Some(parent_id),
            option: Some(option_id),
            coverage,
            last_span: Some(span),
            lm_states,
            scores,
            future_score,
            total_score,
            arcs: Vec::new(),
        }
    }

    pub fn recombination_key(&self, with_reordering: bool) -> RecombinationKey {
        RecombinationKey {
            coverage: self.coverage.clone(),
            lm_states: self.lm_states.clone(),
            last_end: self.last_span.map(|s| s.end()),
            reordering: if with_reordering { self.last_span } else { None },
        }
    }

    pub fn prev(&self) -> Option<HypothesisId> {
        self.prev
    }

    pub fn option(&self) -> Option<OptionId> {
        self.option
    }

    pub fn coverage(&self) -> &CoverageBitmap {
        &self.coverage
    }

    pub fn last_span(&self) -> Option<Span> {
        self.last_span
    }

    pub fn lm_states(&self) -> &[Option<LmState>] {
        &self.lm_states
    }

    pub fn scores(&self) -> &ScoreVector {
        &self.scores
    }

    pub fn future_score(&self) -> Score {
        self.future_score
    }

    pub fn total_score(&self) -> Score {
        self.total_score
    }

    /// Score of the translated part alone.
    pub fn partial_score(&self) -> Score {
        self.total_score - self.future_score
    }

    /// Lower-scoring hypotheses recombined into this one.
    pub fn arcs(&self) -> &[HypothesisId] {
        &self.arcs
    }

    /// Bare hypothesis with the given coverage and score, for stack tests.
    #[cfg(test)]
    pub(crate) fn stub(coverage: CoverageBitmap, last_span: Option<Span>, total_score: Score) -> Self {
        Self {
            prev: None,
            option: None,
            coverage,
            last_span,
            lm_states: SmallVec::new(),
            scores: ScoreVector::default(),
            future_score: 0.0,
            total_score,
            arcs: Vec::new(),
        }
    }
}

/// Whether `span` may extend `coverage` under a reordering window of `limit`
/// words; a negative limit allows any non-overlapping span.
///
/// A span may always start at the first gap. Any other span must start
/// after it and end within `limit` words of it.
pub fn distortion_permits(coverage: &CoverageBitmap, span: Span, limit: i32) -> bool {
    if coverage.overlaps(span) {
        return false;
    }
    let Ok(limit) = usize::try_from(limit) else {
        return true;
    };
    match coverage.first_gap() {
        Some(gap) => span.start() == gap || (span.start() > gap && span.end() <= gap + limit),
        None => false,
    }
}

/// Distortion paid as early as possible (Moore & Quirk, 2007): jumps are
/// charged relative to the end of the fully translated prefix.
fn early_distortion_cost(prev: Option<Span>, curr: Span, first_gap: Option<usize>) -> Score {
    let len = curr.len() as isize;
    let prefix_end = first_gap.map_or(-1, |gap| gap as isize - 1);
    let start = curr.start() as isize;
    if start == prefix_end + 1 {
        return 0.0;
    }
    let prev_end = prev.map_or(-1, |p| p.end() as isize);
    let cost = if (curr.end() as isize) < prev_end {
        2 * len
    } else if prev_end <= prefix_end {
        2 * (start - prefix_end - 1 + len)
    } else {
        2 * (start - prev_end - 1 + len)
    };
    -(cost as Score)
}

/// Owner of every hypothesis created while decoding one sentence.
#[derive(Debug, Default)]
pub struct HypothesisArena {
    hypotheses: Vec<Hypothesis>,
}

impl HypothesisArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, hypothesis: Hypothesis) -> HypothesisId {
        let id = HypothesisId(self.hypotheses.len() as u32);
        self.hypotheses.push(hypothesis);
        id
    }

    pub fn get(&self, id: HypothesisId) -> &Hypothesis {
        &self.hypotheses[id.index()]
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// Records `loser` as an arc of `winner`. Arcs the loser had collected
    /// move over to the winner, since they share its key too.
    pub fn add_arc(&mut self, winner: HypothesisId, loser: HypothesisId) {
        debug_assert_ne!(winner, loser);
        let inherited = std::mem::take(&mut self.hypotheses[loser.index()].arcs);
        let arcs = &mut self.hypotheses[winner.index()].arcs;
        arcs.extend(inherited);
        arcs.push(loser);
    }

    /// Keeps the `limit` best arcs of `id`, ties broken by age.
    pub fn truncate_arcs(&mut self, id: HypothesisId, limit: usize) {
        let mut arcs = std::mem::take(&mut self.hypotheses[id.index()].arcs);
        if arcs.len() > limit {
            arcs.sort_by(|a, b| {
                self.get(*b)
                    .total_score
                    .total_cmp(&self.get(*a).total_score)
                    .then_with(|| a.cmp(b))
            });
            arcs.truncate(limit);
        }
        self.hypotheses[id.index()].arcs = arcs;
    }

    /// Drops all arcs of `id`.
    pub fn clear_arcs(&mut self, id: HypothesisId) {
        self.hypotheses[id.index()].arcs.clear();
    }

    /// `id` and its ancestors, root first.
    pub fn path(&self, id: HypothesisId) -> Vec<HypothesisId> {
        let mut path = vec![id];
        let mut current = self.get(id).prev;
        while let Some(prev) = current {
            path.push(prev);
            current = self.get(prev).prev;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_when_limit_is_zero() {
        let coverage = CoverageBitmap::new(4).with_span(Span::single(0));
        assert!(distortion_permits(&coverage, Span::new(1, 2), 0));
        assert!(!distortion_permits(&coverage, Span::single(2), 0));
    }

    #[test]
    fn window_is_measured_from_the_first_gap() {
        let coverage = CoverageBitmap::new(6).with_span(Span::single(0));
        assert!(distortion_permits(&coverage, Span::single(3), 2));
        assert!(!distortion_permits(&coverage, Span::new(3, 4), 2));
        assert!(!distortion_permits(&coverage, Span::single(0), 2));
        // Returning to the gap is always allowed.
        let jumped = coverage.with_span(Span::single(3));
        assert!(distortion_permits(&jumped, Span::new(1, 2), 2));
    }

    #[test]
    fn negative_limit_only_checks_overlap() {
        let coverage = CoverageBitmap::new(10).with_span(Span::single(0));
        assert!(distortion_permits(&coverage, Span::single(9), -1));
        assert!(!distortion_permits(&coverage, Span::new(0, 1), -1));
    }

    #[test]
    fn early_distortion_is_free_at_the_prefix_edge() {
        assert_eq!(early_distortion_cost(None, Span::new(0, 1), Some(0)), 0.0);
        assert_eq!(
            early_distortion_cost(Some(Span::new(0, 1)), Span::new(2, 2), Some(2)),
            0.0
        );
    }

    #[test]
    fn early_distortion_charges_skipped_words_up_front() {
        // Jumping over two words from the start: 2 * (2 skipped + 1 covered).
        assert_eq!(early_distortion_cost(None, Span::new(2, 2), Some(0)), -6.0);
        // Moving back left of the previous phrase: 2 * length.
        assert_eq!(
            early_distortion_cost(Some(Span::new(3, 3)), Span::new(1, 2), Some(0)),
            -4.0
        );
        // Continuing past a gap from a phrase beyond the prefix.
        assert_eq!(
            early_distortion_cost(Some(Span::new(2, 2)), Span::new(4, 4), Some(0)),
            -4.0
        );
    }
}
