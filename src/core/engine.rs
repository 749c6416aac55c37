// File: src/core/engine.rs
use crate::core::config::DecoderConfig;
use crate::core::features::{FeatureSet, Models};
use crate::core::manager::{Derivation, Manager, SentenceStats};
use crate::core::options::TranslationOptionCollection;
use crate::core::search_graph::SearchGraph;
use crate::core::span::Span;
use crate::core::types::Score;
use crate::core::vocab::Vocabulary;
use crate::error::{ConfigError, DecodeError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One translated phrase of the output, in target order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub span: Span,
    pub source: String,
    pub target: String,
}

/// A derivation rendered back to text, with its per-feature breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub segments: Vec<Segment>,
    pub total_score: Score,
    pub scores: Vec<(String, Vec<Score>)>,
}

/// Result of decoding one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub sentence: usize,
    pub best: Candidate,
    /// Empty unless n-best output is configured.
    pub nbest: Vec<Candidate>,
    /// False when the time budget cut the search short.
    pub complete: bool,
    pub stats: SentenceStats,
}

// The decoder owns the frozen feature set and is shared read-only between
// sentences; all per-sentence state lives in a `Manager`.
pub struct Decoder {
    features: FeatureSet,
    vocab: Arc<Vocabulary>,
    config: DecoderConfig,
}

impl Decoder {
    /// Validates `config` against the models' feature layout.
    pub fn new(models: Models, vocab: Arc<Vocabulary>, config: DecoderConfig) -> Result<Self, ConfigError> {
        let features = FeatureSet::new(models, &config)?;
        tracing::info!(
            features = features.layout.total(),
            language_models = features.models.language_models.len(),
            reordering = features.models.reordering.is_some(),
            "decoder ready"
        );
        Ok(Self {
            features,
            vocab,
            config,
        })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn vocab(&self) -> &Arc<Vocabulary> {
        &self.vocab
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Decodes one whitespace-tokenized sentence.
    pub fn translate(&self, sentence: usize, text: &str) -> Result<Translation, DecodeError> {
        self.run(sentence, text, |manager| self.translation(sentence, manager))
    }

    /// Like `translate`, also copying out the search graph.
    pub fn translate_with_graph(
        &self,
        sentence: usize,
        text: &str,
    ) -> Result<(Translation, SearchGraph), DecodeError> {
        self.run(sentence, text, |manager| {
            (self.translation(sentence, manager), manager.search_graph())
        })
    }

    /// Decodes independent sentences on the rayon pool. Results are in input
    /// order; sentence ids are input positions.
    pub fn translate_batch<S: AsRef<str> + Sync>(
        &self,
        sentences: &[S],
    ) -> Vec<Result<Translation, DecodeError>> {
        sentences
            .par_iter()
            .enumerate()
            .map(|(sentence, text)| self.translate(sentence, text.as_ref()))
            .collect()
    }

    fn run<T>(
        &self,
        sentence: usize,
        text: &str,
        finish: impl FnOnce(&Manager<'_>) -> T,
    ) -> Result<T, DecodeError> {
        let source = self.vocab.tokenize(text);
        let options =
            TranslationOptionCollection::build(sentence, &source, &self.features, &self.config, &self.vocab)?;
        let mut manager = Manager::new(sentence, options, &self.features, &self.config);
        manager.decode()?;
        let stats = manager.stats();
        tracing::info!(
            sentence,
            words = source.len(),
            complete = manager.is_complete(),
            hypotheses = stats.created,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "sentence decoded"
        );
        Ok(finish(&manager))
    }

    fn translation(&self, sentence: usize, manager: &Manager<'_>) -> Translation {
        let best = manager
            .best_derivation()
            .map(|derivation| self.render(manager, &derivation))
            .unwrap_or_else(|| Candidate {
                text: String::new(),
                segments: Vec::new(),
                total_score: Score::NEG_INFINITY,
                scores: Vec::new(),
            });
        let nbest = manager
            .nbest()
            .iter()
            .map(|derivation| self.render(manager, derivation))
            .collect();
        Translation {
            sentence,
            best,
            nbest,
            complete: manager.is_complete(),
            stats: manager.stats().clone(),
        }
    }

    fn render(&self, manager: &Manager<'_>, derivation: &Derivation) -> Candidate {
        let source = manager.options().source();
        let segments: Vec<Segment> = derivation
            .steps
            .iter()
            .map(|step| Segment {
                span: step.span,
                source: self.vocab.render(&source[step.span.start()..=step.span.end()]),
                target: self.vocab.render(&step.target),
            })
            .collect();
        let text = segments
            .iter()
            .filter(|s| !s.target.is_empty())
            .map(|s| s.target.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Candidate {
            text,
            segments,
            total_score: derivation.total_score,
            scores: derivation.scores.breakdown(&self.features.layout),
        }
    }
}
