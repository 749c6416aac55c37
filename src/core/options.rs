// File: src/core/options.rs
// Per-sentence translation options and the future cost table derived from
// them.

use crate::core::config::{DecoderConfig, UnknownWordPolicy};
use crate::core::features::FeatureSet;
use crate::core::future_cost::FutureCostMatrix;
use crate::core::phrase_table::PhraseCandidate;
use crate::core::score::ScoreVector;
use crate::core::span::Span;
use crate::core::types::{cmp_desc, Phrase, Score, WordId};
use crate::core::vocab::Vocabulary;
use crate::error::DecodeError;
use smallvec::smallvec;
use std::ops::Range;

/// Index of an option inside its `TranslationOptionCollection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(u32);

/// One scored way of translating a source span.
#[derive(Debug, Clone)]
pub struct TranslationOption {
    span: Span,
    target: Phrase,
    /// Translation model, unknown-word and phrase-internal LM scores.
    scores: ScoreVector,
    /// Weighted score plus word penalty and LM boundary estimates; feeds
    /// the future cost table and the per-span ranking.
    future_score: Score,
    unknown: bool,
}

impl TranslationOption {
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn target(&self) -> &[WordId] {
        &self.target
    }

    pub fn scores(&self) -> &ScoreVector {
        &self.scores
    }

    pub fn future_score(&self) -> Score {
        self.future_score
    }

    /// Whether this option was synthesized for an untranslatable word.
    pub fn is_unknown(&self) -> bool {
        self.unknown
    }
}

/// All options for one sentence, grouped by span, plus the future cost table.
pub struct TranslationOptionCollection {
    source: Phrase,
    options: Vec<TranslationOption>,
    by_span: Vec<Range<u32>>,
    future_costs: FutureCostMatrix,
}

impl TranslationOptionCollection {
    /// Looks up every span of `source` once, shortest spans first, keeps the
    /// best `max_options_per_span` candidates per span and synthesizes an
    /// unknown-word option for any single word left without one.
    pub fn build(
        sentence: usize,
        source: &[WordId],
        features: &FeatureSet,
        config: &DecoderConfig,
        vocab: &Vocabulary,
    ) -> Result<Self, DecodeError> {
        let n = source.len();
        let mut options = Vec::new();
        let mut by_span = vec![0..0; n * n];
        // Starts whose prefix the table cannot extend any further.
        let mut blocked = vec![false; n];

        for len in 1..=config.max_phrase_length.min(n) {
            for start in 0..=n - len {
                let span = Span::new(start, start + len - 1);
                let words = &source[span.start()..=span.end()];
                let mut list: Vec<TranslationOption> = Vec::new();
                if !blocked[start] {
                    if features.models.phrase_table.has_prefix(words) {
                        list = features
                            .models
                            .phrase_table
                            .lookup(words)
                            .into_iter()
                            .map(|candidate| Self::make_option(span, candidate, false, features))
                            .collect();
                    } else {
                        blocked[start] = true;
                    }
                }
                // Stable sort: equal scores keep table order.
                list.sort_by(|a, b| cmp_desc(a.future_score, b.future_score));
                if config.max_options_per_span > 0 {
                    list.truncate(config.max_options_per_span);
                }
                if len == 1 && list.is_empty() {
                    let word = source[start];
                    tracing::warn!(
                        sentence,
                        position = start,
                        word = %vocab.word(word),
                        "no translation found, using unknown-word fallback"
                    );
                    list.push(Self::unknown_option(start, word, features, config, vocab));
                }
                let first = options.len() as u32;
                options.extend(list);
                by_span[start * n + span.end()] = first..options.len() as u32;
            }
        }

        for pos in 0..n {
            if by_span[pos * n + pos].is_empty() {
                return Err(DecodeError::UncoverableSpan {
                    sentence,
                    span: Span::single(pos),
                });
            }
        }

        let future_costs =
            FutureCostMatrix::compute(n, options.iter().map(|o| (o.span, o.future_score)));
        tracing::debug!(sentence, options = options.len(), "translation options collected");

        Ok(Self {
            source: source.iter().copied().collect(),
            options,
            by_span,
            future_costs,
        })
    }

    fn make_option(
        span: Span,
        candidate: PhraseCandidate,
        unknown: bool,
        features: &FeatureSet,
    ) -> TranslationOption {
        let producers = &features.producers;
        let layout = &features.layout;
        let mut scores = layout.zeros();

        let tm_len = layout.components(producers.translation);
        debug_assert_eq!(candidate.scores.len(), tm_len, "phrase table score arity");
        for (i, &raw) in candidate.scores.iter().take(tm_len).enumerate() {
            scores.add(layout, producers.translation, i, features.floor(raw, 1));
        }
        if unknown {
            scores.add(layout, producers.unknown_word, 0, 1.0);
        }

        let target = candidate.target;
        let mut boundary_estimate = 0.0;
        for (lm, &producer) in features
            .models
            .language_models
            .iter()
            .zip(&producers.language_models)
        {
            let phrase = lm.score_phrase(&target);
            let boundary_words = target.len().min(lm.order().saturating_sub(1));
            let inner_words = target.len() - boundary_words;
            scores.add(layout, producer, 0, features.floor(phrase.inner, inner_words));
            boundary_estimate += features.weight(producer)
                * features.floor(phrase.boundary_estimate, boundary_words);
        }

        let future_score = scores.inner_product(&features.weights)
            + features.weight(producers.word_penalty) * -(target.len() as Score)
            + boundary_estimate;

        TranslationOption {
            span,
            target,
            scores,
            future_score,
            unknown,
        }
    }

    fn unknown_option(
        pos: usize,
        word: WordId,
        features: &FeatureSet,
        config: &DecoderConfig,
        vocab: &Vocabulary,
    ) -> TranslationOption {
        let keep = match config.unknown_word_policy {
            UnknownWordPolicy::CopyThrough => true,
            UnknownWordPolicy::Drop => vocab.word(word).chars().any(|c| c.is_ascii_digit()),
        };
        let target = if keep { smallvec![word] } else { Phrase::new() };
        let candidate = PhraseCandidate {
            target,
            scores: vec![0.0; features.layout.components(features.producers.translation)],
        };
        Self::make_option(Span::single(pos), candidate, true, features)
    }

    pub fn source(&self) -> &[WordId] {
        &self.source
    }

    pub fn sentence_len(&self) -> usize {
        self.source.len()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn get(&self, id: OptionId) -> &TranslationOption {
        &self.options[id.0 as usize]
    }

    /// Option ids for `span`, best first.
    pub fn ids_for(&self, span: Span) -> impl Iterator<Item = OptionId> + '_ {
        let n = self.source.len();
        let range = if span.end() < n {
            self.by_span[span.start() * n + span.end()].clone()
        } else {
            0..0
        };
        range.map(OptionId)
    }

    pub fn options_for(&self, span: Span) -> impl Iterator<Item = &TranslationOption> + '_ {
        self.ids_for(span).map(|id| self.get(id))
    }

    pub fn future_costs(&self) -> &FutureCostMatrix {
        &self.future_costs
    }
}
