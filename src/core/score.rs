// File: src/core/score.rs
// Feature layout, per-hypothesis score vectors and the global weight vector.
//
// Every score-producing feature registers a fixed number of components once,
// before decoding starts. After that the layout is frozen and every
// `ScoreVector` in the process has the same length.

use crate::core::types::Score;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::collections::BTreeMap;

pub const TRANSLATION_MODEL: &str = "tm";
pub const DISTORTION: &str = "distortion";
pub const WORD_PENALTY: &str = "word_penalty";
pub const UNKNOWN_WORD_PENALTY: &str = "unknown_word_penalty";
pub const LEXICAL_REORDERING: &str = "lexical_reordering";

/// Name of the `index`-th language model slot.
pub fn language_model_name(index: usize) -> String {
    format!("lm{index}")
}

/// Index of a registered producer inside a `FeatureLayout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProducerId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProducerSlot {
    name: String,
    offset: usize,
    len: usize,
}

/// Ordered registry of score producers and their slice of the score vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureLayout {
    producers: Vec<ProducerSlot>,
    total: usize,
}

impl FeatureLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a producer with `len` components.
    pub fn register(&mut self, name: impl Into<String>, len: usize) -> ProducerId {
        let name = name.into();
        debug_assert!(self.find(&name).is_none(), "producer {name} registered twice");
        self.producers.push(ProducerSlot {
            name,
            offset: self.total,
            len,
        });
        self.total += len;
        ProducerId(self.producers.len() - 1)
    }

    pub fn find(&self, name: &str) -> Option<ProducerId> {
        self.producers.iter().position(|p| p.name == name).map(ProducerId)
    }

    pub fn name(&self, id: ProducerId) -> &str {
        &self.producers[id.0].name
    }

    /// Position of the producer's first component in the score vector.
    pub fn offset(&self, id: ProducerId) -> usize {
        self.producers[id.0].offset
    }

    pub fn components(&self, id: ProducerId) -> usize {
        self.producers[id.0].len
    }

    /// Total number of components across all producers.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn producers(&self) -> impl Iterator<Item = (ProducerId, &str)> + '_ {
        self.producers
            .iter()
            .enumerate()
            .map(|(i, p)| (ProducerId(i), p.name.as_str()))
    }

    fn range(&self, id: ProducerId) -> std::ops::Range<usize> {
        let slot = &self.producers[id.0];
        slot.offset..slot.offset + slot.len
    }

    pub fn zeros(&self) -> ScoreVector {
        ScoreVector {
            values: smallvec![0.0; self.total],
        }
    }

    /// Resolves named weights against this layout. Every producer must have
    /// exactly as many weights as it has components, and no weights may name
    /// an unregistered producer.
    pub fn resolve_weights(
        &self,
        named: &BTreeMap<String, Vec<Score>>,
    ) -> Result<Weights, ConfigError> {
        for name in named.keys() {
            if self.find(name).is_none() {
                return Err(ConfigError::UnknownProducer(name.clone()));
            }
        }
        let mut values = Vec::with_capacity(self.total);
        for slot in &self.producers {
            let weights = named
                .get(&slot.name)
                .ok_or_else(|| ConfigError::MissingWeights(slot.name.clone()))?;
            if weights.len() != slot.len {
                return Err(ConfigError::WeightLengthMismatch {
                    producer: slot.name.clone(),
                    expected: slot.len,
                    found: weights.len(),
                });
            }
            if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("weights.{}", slot.name),
                    reason: format!("weight {bad} is not finite"),
                });
            }
            values.extend_from_slice(weights);
        }
        Ok(Weights { values })
    }
}

/// Global weight vector, parallel to every `ScoreVector` of its layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    values: Vec<Score>,
}

impl Weights {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Score] {
        &self.values
    }
}

/// Fixed-layout feature values of one hypothesis or translation option.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    values: SmallVec<[Score; 12]>,
}

impl ScoreVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Score] {
        &self.values
    }

    /// Adds `value` to component `index` of `producer`.
    pub fn add(&mut self, layout: &FeatureLayout, producer: ProducerId, index: usize, value: Score) {
        let range = layout.range(producer);
        debug_assert!(index < range.len());
        self.values[range.start + index] += value;
    }

    /// Adds a whole slice for `producer`.
    pub fn add_slice(&mut self, layout: &FeatureLayout, producer: ProducerId, values: &[Score]) {
        let range = layout.range(producer);
        debug_assert_eq!(range.len(), values.len());
        for (slot, value) in self.values[range].iter_mut().zip(values) {
            *slot += value;
        }
    }

    pub fn get<'a>(&'a self, layout: &FeatureLayout, producer: ProducerId) -> &'a [Score] {
        &self.values[layout.range(producer)]
    }

    pub fn plus_assign(&mut self, other: &ScoreVector) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
    }

    pub fn minus_assign(&mut self, other: &ScoreVector) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a -= b;
        }
    }

    /// Weighted linear combination of all components.
    pub fn inner_product(&self, weights: &Weights) -> Score {
        debug_assert_eq!(self.len(), weights.len());
        self.values
            .iter()
            .zip(weights.as_slice())
            .map(|(v, w)| v * w)
            .sum()
    }

    /// Per-producer view, for reporting.
    pub fn breakdown(&self, layout: &FeatureLayout) -> Vec<(String, Vec<Score>)> {
        layout
            .producers()
            .map(|(id, name)| (name.to_string(), self.get(layout, id).to_vec()))
            .collect()
    }
}
