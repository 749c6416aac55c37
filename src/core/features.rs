// File: src/core/features.rs
// The models consulted during search and the feature layout they share.

use crate::core::config::DecoderConfig;
use crate::core::lm::LanguageModel;
use crate::core::phrase_table::PhraseTable;
use crate::core::reordering::ReorderingModel;
use crate::core::score::{
    language_model_name, FeatureLayout, ProducerId, Weights, DISTORTION, LEXICAL_REORDERING,
    TRANSLATION_MODEL, UNKNOWN_WORD_PENALTY, WORD_PENALTY,
};
use crate::core::types::{floor_score, Score};
use crate::error::ConfigError;
use std::sync::Arc;

/// Read-only collaborators, loaded once and shared between sentences.
#[derive(Clone)]
pub struct Models {
    pub phrase_table: Arc<dyn PhraseTable>,
    pub language_models: Vec<Arc<dyn LanguageModel>>,
    pub reordering: Option<Arc<dyn ReorderingModel>>,
}

impl Models {
    pub fn new(phrase_table: Arc<dyn PhraseTable>) -> Self {
        Self {
            phrase_table,
            language_models: Vec::new(),
            reordering: None,
        }
    }

    pub fn with_language_model(mut self, lm: Arc<dyn LanguageModel>) -> Self {
        self.language_models.push(lm);
        self
    }

    pub fn with_reordering(mut self, model: Arc<dyn ReorderingModel>) -> Self {
        self.reordering = Some(model);
        self
    }

    /// The feature layout these models produce, in registration order.
    pub fn layout(&self) -> FeatureLayout {
        self.register().0
    }

    fn register(&self) -> (FeatureLayout, Producers) {
        let mut layout = FeatureLayout::new();
        let translation = layout.register(TRANSLATION_MODEL, self.phrase_table.num_scores());
        let distortion = layout.register(DISTORTION, 1);
        let word_penalty = layout.register(WORD_PENALTY, 1);
        let unknown_word = layout.register(UNKNOWN_WORD_PENALTY, 1);
        let language_models = (0..self.language_models.len())
            .map(|i| layout.register(language_model_name(i), 1))
            .collect();
        let reordering = self
            .reordering
            .as_ref()
            .map(|model| layout.register(LEXICAL_REORDERING, model.num_scores()));
        let producers = Producers {
            translation,
            distortion,
            word_penalty,
            unknown_word,
            language_models,
            reordering,
        };
        (layout, producers)
    }
}

/// Producer ids of every registered feature.
#[derive(Debug, Clone)]
pub struct Producers {
    pub translation: ProducerId,
    pub distortion: ProducerId,
    pub word_penalty: ProducerId,
    pub unknown_word: ProducerId,
    pub language_models: Vec<ProducerId>,
    pub reordering: Option<ProducerId>,
}

/// Models, frozen layout and resolved weights: everything scoring needs.
pub struct FeatureSet {
    pub models: Models,
    pub layout: FeatureLayout,
    pub producers: Producers,
    pub weights: Weights,
    pub floor: Score,
}

impl FeatureSet {
    pub fn new(models: Models, config: &DecoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (layout, producers) = models.register();
        let weights = layout.resolve_weights(&config.weights)?;
        Ok(Self {
            models,
            layout,
            producers,
            weights,
            floor: config.score_floor,
        })
    }

    /// Single weight of a one-component producer.
    pub fn weight(&self, producer: ProducerId) -> Score {
        self.weights.as_slice()[self.layout.offset(producer)]
    }

    /// Floors a model score that summed over `words` scored words.
    pub fn floor(&self, score: Score, words: usize) -> Score {
        floor_score(score, self.floor * words.max(1) as Score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::phrase_table::PhraseCandidate;
    use crate::core::types::WordId;
    use std::collections::BTreeMap;

    struct EmptyTable;

    impl PhraseTable for EmptyTable {
        fn num_scores(&self) -> usize {
            2
        }

        fn lookup(&self, _source: &[WordId]) -> Vec<PhraseCandidate> {
            Vec::new()
        }
    }

    #[test]
    fn layout_order_is_fixed() {
        let models = Models::new(Arc::new(EmptyTable));
        let names: Vec<String> = models.layout().producers().map(|(_, n)| n.to_string()).collect();
        assert_eq!(names, vec!["tm", "distortion", "word_penalty", "unknown_word_penalty"]);
    }

    #[test]
    fn single_weights_are_located_by_producer() {
        let models = Models::new(Arc::new(EmptyTable));
        let config = DecoderConfig {
            weights: BTreeMap::from([
                ("tm".to_string(), vec![1.0, 0.5]),
                ("distortion".to_string(), vec![0.3]),
                ("word_penalty".to_string(), vec![-1.0]),
                ("unknown_word_penalty".to_string(), vec![-100.0]),
            ]),
            ..DecoderConfig::default()
        };
        let features = FeatureSet::new(models, &config).unwrap();
        assert_eq!(features.weight(features.producers.distortion), 0.3);
        assert_eq!(features.weight(features.producers.unknown_word), -100.0);
    }

    #[test]
    fn floor_scales_with_scored_words() {
        let models = Models::new(Arc::new(EmptyTable));
        let config = DecoderConfig {
            weights: BTreeMap::from([
                ("tm".to_string(), vec![1.0, 1.0]),
                ("distortion".to_string(), vec![1.0]),
                ("word_penalty".to_string(), vec![1.0]),
                ("unknown_word_penalty".to_string(), vec![1.0]),
            ]),
            ..DecoderConfig::default()
        };
        let features = FeatureSet::new(models, &config).unwrap();
        assert_eq!(features.floor(f32::NEG_INFINITY, 3), -300.0);
        assert_eq!(features.floor(-12.0, 3), -12.0);
        assert_eq!(features.floor(f32::NAN, 0), -100.0);
    }
}
