// File: src/core/manager.rs
// Stack-by-stack search over one sentence.

use crate::core::config::DecoderConfig;
use crate::core::features::FeatureSet;
use crate::core::hypothesis::{distortion_permits, Hypothesis, HypothesisArena, HypothesisId, Scorer};
use crate::core::nbest::{self, NBestRequest};
use crate::core::options::TranslationOptionCollection;
use crate::core::score::ScoreVector;
use crate::core::search_graph::{SearchGraph, SearchGraphNode};
use crate::core::span::Span;
use crate::core::stack::{HypothesisStack, InsertOutcome};
use crate::core::types::{Phrase, Score};
use crate::error::DecodeError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Only the root hypothesis exists.
    Seeded,
    /// Extending the survivors of stack `k`.
    Expanding(usize),
    Done,
}

/// Counters for one sentence's search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceStats {
    pub created: usize,
    pub recombined: usize,
    pub discarded: usize,
    pub pruned: usize,
    /// The time budget ran out before the last stack was reached.
    pub interrupted: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivationStep {
    pub span: Span,
    pub target: Phrase,
}

/// A derivation read back from the lattice, phrases in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub steps: Vec<DerivationStep>,
    pub scores: ScoreVector,
    pub total_score: Score,
}

pub struct Manager<'a> {
    sentence: usize,
    features: &'a FeatureSet,
    config: &'a DecoderConfig,
    options: TranslationOptionCollection,
    arena: HypothesisArena,
    /// Indexed by coverage count.
    stacks: Vec<HypothesisStack>,
    state: SearchState,
    stats: SentenceStats,
    /// Highest stack that has been pruned.
    finished_stack: usize,
}

impl<'a> Manager<'a> {
    /// Seeds stack 0 with the empty hypothesis.
    pub fn new(
        sentence: usize,
        options: TranslationOptionCollection,
        features: &'a FeatureSet,
        config: &'a DecoderConfig,
    ) -> Self {
        let keep_arcs = config.nbest_enabled();
        let with_reordering = features.models.reordering.is_some();
        let mut stacks: Vec<HypothesisStack> = (0..=options.sentence_len())
            .map(|_| HypothesisStack::new(config.beam_threshold, keep_arcs, with_reordering))
            .collect();

        let mut arena = HypothesisArena::new();
        let root = Hypothesis::root(&Scorer {
            features,
            options: &options,
            early_distortion_cost: config.early_distortion_cost,
        });
        stacks[0].insert(&mut arena, root);

        Self {
            sentence,
            features,
            config,
            options,
            arena,
            stacks,
            state: SearchState::Seeded,
            stats: SentenceStats {
                created: 1,
                ..SentenceStats::default()
            },
            finished_stack: 0,
        }
    }

    /// Runs the search to the last stack, or until the time budget is spent.
    pub fn decode(&mut self) -> Result<(), DecodeError> {
        assert_eq!(self.state, SearchState::Seeded, "a manager decodes once");
        let started = Instant::now();
        let deadline = self
            .config
            .time_limit_ms
            .map(|ms| started + Duration::from_millis(ms));
        let n = self.options.sentence_len();

        for k in 0..=n {
            self.finish_stack(k);
            if k == n {
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::warn!(
                    sentence = self.sentence,
                    stack = k,
                    "time budget exhausted, falling back to best partial hypothesis"
                );
                self.stats.interrupted = true;
                break;
            }
            self.state = SearchState::Expanding(k);
            self.expand(k);
        }

        self.state = SearchState::Done;
        self.stats.elapsed = started.elapsed();
        match self.best() {
            Some(_) => Ok(()),
            None => Err(DecodeError::SearchExhausted {
                sentence: self.sentence,
            }),
        }
    }

    fn finish_stack(&mut self, k: usize) {
        let stack = &mut self.stacks[k];
        let pruned = stack.prune(&self.arena, self.config.stack_size);
        if self.config.nbest_enabled() {
            stack.cleanup_arcs(&mut self.arena, self.config.arc_limit());
        }
        self.stats.pruned += pruned;
        self.finished_stack = k;
        tracing::debug!(
            sentence = self.sentence,
            stack = k,
            size = stack.len(),
            pruned,
            best = stack.best_score(),
            "stack finished"
        );
    }

    /// Extends every survivor of stack `k` by every admissible option.
    fn expand(&mut self, k: usize) {
        let scorer = Scorer {
            features: self.features,
            options: &self.options,
            early_distortion_cost: self.config.early_distortion_cost,
        };
        let limit = self.config.distortion_limit;
        let max_len = self.config.max_phrase_length;
        let parents: Vec<HypothesisId> = self.stacks[k].iter().collect();
        let arena = &self.arena;

        // Children are produced per parent in stack order either way, so the
        // insertion sequence below is the same with or without rayon.
        let children: Vec<Hypothesis> = if self.config.parallel_expansion {
            parents
                .par_iter()
                .map(|&parent| extensions(arena, parent, &scorer, limit, max_len))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        } else {
            parents
                .iter()
                .flat_map(|&parent| extensions(arena, parent, &scorer, limit, max_len))
                .collect()
        };

        for child in children {
            let target = child.coverage().count();
            self.stats.created += 1;
            match self.stacks[target].insert(&mut self.arena, child) {
                InsertOutcome::Added(_) => {}
                InsertOutcome::Replaced { .. } | InsertOutcome::Recombined { .. } => {
                    self.stats.recombined += 1
                }
                InsertOutcome::Discarded => self.stats.discarded += 1,
            }
        }
    }

    /// Best hypothesis of the highest finished stack that has one.
    pub fn best(&self) -> Option<HypothesisId> {
        (0..=self.finished_stack)
            .rev()
            .find_map(|k| self.stacks[k].best(&self.arena))
    }

    /// Whether the best hypothesis translates the whole sentence.
    pub fn is_complete(&self) -> bool {
        self.best()
            .is_some_and(|id| self.arena.get(id).coverage().is_complete())
    }

    pub fn best_derivation(&self) -> Option<Derivation> {
        let id = self.best()?;
        let hypothesis = self.arena.get(id);
        Some(Derivation {
            steps: self.steps(self.arena.path(id).into_iter()),
            scores: hypothesis.scores().clone(),
            total_score: hypothesis.partial_score(),
        })
    }

    /// Up to `nbest_size` derivations, best first. Empty when n-best is off
    /// or the search was interrupted.
    pub fn nbest(&self) -> Vec<Derivation> {
        if !self.config.nbest_enabled() || !self.is_complete() {
            return Vec::new();
        }
        let finals = self.stacks[self.options.sentence_len()].ranked(&self.arena);
        let request = NBestRequest {
            count: self.config.nbest_size,
            distinct: self.config.nbest_distinct,
            factor: self.config.effective_nbest_factor(),
        };
        nbest::extract(
            &self.arena,
            &finals,
            &self.options,
            &self.features.weights,
            request,
        )
        .into_iter()
        .map(|path| Derivation {
            steps: self.steps(path.hypotheses()),
            scores: path.scores().clone(),
            total_score: path.total_score(),
        })
        .collect()
    }

    fn steps(&self, path: impl Iterator<Item = HypothesisId>) -> Vec<DerivationStep> {
        path.filter_map(|id| self.arena.get(id).option())
            .map(|option| {
                let option = self.options.get(option);
                DerivationStep {
                    span: option.span(),
                    target: option.target().iter().copied().collect(),
                }
            })
            .collect()
    }

    /// Copies out every hypothesis retained in a finished stack, plus arcs.
    pub fn search_graph(&self) -> SearchGraph {
        let mut nodes = Vec::new();
        for (k, stack) in self.stacks[..=self.finished_stack].iter().enumerate() {
            for id in stack.iter() {
                nodes.push(self.graph_node(k, id, None));
                for &arc in self.arena.get(id).arcs() {
                    nodes.push(self.graph_node(k, arc, Some(id)));
                }
            }
        }
        SearchGraph {
            sentence: self.sentence,
            nodes,
        }
    }

    fn graph_node(&self, stack: usize, id: HypothesisId, winner: Option<HypothesisId>) -> SearchGraphNode {
        let hypothesis = self.arena.get(id);
        let option = hypothesis.option().map(|option| self.options.get(option));
        let transition_score = hypothesis.prev().map_or(0.0, |prev| {
            hypothesis.partial_score() - self.arena.get(prev).partial_score()
        });
        SearchGraphNode {
            id: id.index() as u32,
            stack,
            back: hypothesis.prev().map(|prev| prev.index() as u32),
            recombined_into: winner.map(|w| w.index() as u32),
            span: option.map(|o| o.span()),
            target: option.map(|o| o.target().to_vec()).unwrap_or_default(),
            transition_score,
            total_score: hypothesis.total_score(),
            future_score: hypothesis.future_score(),
            covered: hypothesis.coverage().count(),
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn stats(&self) -> &SentenceStats {
        &self.stats
    }

    pub fn arena(&self) -> &HypothesisArena {
        &self.arena
    }

    pub fn options(&self) -> &TranslationOptionCollection {
        &self.options
    }

    pub fn stack(&self, k: usize) -> &HypothesisStack {
        &self.stacks[k]
    }
}

/// All children of `parent_id`, spans left to right, shorter spans first.
fn extensions(
    arena: &HypothesisArena,
    parent_id: HypothesisId,
    scorer: &Scorer<'_>,
    distortion_limit: i32,
    max_phrase_length: usize,
) -> Vec<Hypothesis> {
    let parent = arena.get(parent_id);
    let coverage = parent.coverage();
    let n = coverage.len();
    let mut children = Vec::new();
    for start in (0..n).filter(|&pos| !coverage.is_set(pos)) {
        for end in start..n.min(start + max_phrase_length) {
            if coverage.is_set(end) {
                break;
            }
            let span = Span::new(start, end);
            if !distortion_permits(coverage, span, distortion_limit) {
                continue;
            }
            for id in scorer.options.ids_for(span) {
                children.push(Hypothesis::extend(
                    parent_id,
                    parent,
                    id,
                    scorer.options.get(id),
                    scorer,
                ));
            }
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::Models;
    use crate::core::vocab::Vocabulary;
    use crate::models::phrase_table::MemoryPhraseTable;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn setup(config: DecoderConfig) -> (Vocabulary, FeatureSet, DecoderConfig) {
        let vocab = Vocabulary::new();
        let mut table = MemoryPhraseTable::new(1);
        table.insert_text(&vocab, "a", "x", vec![-1.0]);
        table.insert_text(&vocab, "b", "y", vec![-1.0]);
        table.insert_text(&vocab, "c", "z", vec![-1.0]);
        let config = DecoderConfig {
            weights: BTreeMap::from([
                ("tm".to_string(), vec![1.0]),
                ("distortion".to_string(), vec![1.0]),
                ("word_penalty".to_string(), vec![0.0]),
                ("unknown_word_penalty".to_string(), vec![-100.0]),
            ]),
            ..config
        };
        let features = FeatureSet::new(Models::new(Arc::new(table)), &config).unwrap();
        (vocab, features, config)
    }

    #[test]
    fn walks_through_every_state() {
        let (vocab, features, config) = setup(DecoderConfig::default());
        let source = vocab.tokenize("a b c");
        let options = TranslationOptionCollection::build(0, &source, &features, &config, &vocab).unwrap();
        let mut manager = Manager::new(0, options, &features, &config);
        assert_eq!(manager.state(), SearchState::Seeded);
        assert_eq!(manager.stack(0).len(), 1);

        manager.decode().unwrap();
        assert_eq!(manager.state(), SearchState::Done);
        assert!(manager.is_complete());
        let best = manager.best_derivation().unwrap();
        let spans: Vec<Span> = best.steps.iter().map(|s| s.span).collect();
        assert_eq!(spans, vec![Span::single(0), Span::single(1), Span::single(2)]);
        assert_eq!(best.total_score, -3.0);
    }

    #[test]
    fn zero_time_budget_returns_a_partial_hypothesis() {
        let (vocab, features, config) = setup(DecoderConfig {
            time_limit_ms: Some(0),
            ..DecoderConfig::default()
        });
        let source = vocab.tokenize("a b c");
        let options = TranslationOptionCollection::build(0, &source, &features, &config, &vocab).unwrap();
        let mut manager = Manager::new(0, options, &features, &config);
        manager.decode().unwrap();
        assert!(manager.stats().interrupted);
        assert!(!manager.is_complete());
        assert!(manager.nbest().is_empty());
    }

    #[test]
    fn search_graph_links_back_to_the_root() {
        let (vocab, features, config) = setup(DecoderConfig {
            nbest_size: 5,
            distortion_limit: -1,
            ..DecoderConfig::default()
        });
        let source = vocab.tokenize("a b c");
        let options = TranslationOptionCollection::build(0, &source, &features, &config, &vocab).unwrap();
        let mut manager = Manager::new(0, options, &features, &config);
        manager.decode().unwrap();
        let graph = manager.search_graph();
        let root = &graph.nodes[0];
        assert_eq!(root.back, None);
        assert_eq!(root.covered, 0);
        // Complete orders only recombine when they end on the same word:
        // three keys, two orders each.
        assert_eq!(graph.retained().filter(|n| n.covered == 3).count(), 3);
        assert_eq!(graph.arcs().count(), 3);
        assert!(graph.arcs().all(|n| n.covered == 3));
        for node in graph.nodes.iter().skip(1) {
            assert!(node.back.is_some());
        }
    }
}
