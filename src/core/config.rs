// File: src/core/config.rs
use crate::core::types::{Score, DEFAULT_SCORE_FLOOR};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What to do with a source word the phrase table cannot translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownWordPolicy {
    /// Emit the source word unchanged.
    #[default]
    CopyThrough,
    /// Emit nothing, except for tokens containing a digit, which are copied.
    Drop,
}

/// Search parameters, validated once when a `Decoder` is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Hypotheses scoring more than this below the best of their stack are
    /// pruned. Log domain, non-negative.
    pub beam_threshold: Score,
    /// Histogram pruning limit per stack; 0 keeps everything.
    pub stack_size: usize,
    /// Options kept per source span; 0 keeps everything.
    pub max_options_per_span: usize,
    pub max_phrase_length: usize,
    /// Reordering window; negative means unlimited.
    pub distortion_limit: i32,
    pub early_distortion_cost: bool,
    pub unknown_word_policy: UnknownWordPolicy,
    pub score_floor: Score,
    /// Feature weights by producer name.
    pub weights: BTreeMap<String, Vec<Score>>,
    /// Length of the n-best list; 0 disables arc tracking.
    pub nbest_size: usize,
    pub nbest_distinct: bool,
    pub nbest_factor: usize,
    pub parallel_expansion: bool,
    /// Wall-clock budget per sentence.
    pub time_limit_ms: Option<u64>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            beam_threshold: 1e5_f32.ln(),
            stack_size: 200,
            max_options_per_span: 20,
            max_phrase_length: 20,
            distortion_limit: 6,
            early_distortion_cost: false,
            unknown_word_policy: UnknownWordPolicy::CopyThrough,
            score_floor: DEFAULT_SCORE_FLOOR,
            weights: BTreeMap::new(),
            nbest_size: 0,
            nbest_distinct: false,
            nbest_factor: 20,
            parallel_expansion: false,
            time_limit_ms: None,
        }
    }
}

impl DecoderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn nbest_enabled(&self) -> bool {
        self.nbest_size > 0
    }

    /// Arcs kept per hypothesis after its stack is pruned.
    pub fn arc_limit(&self) -> usize {
        self.nbest_size.saturating_mul(self.effective_nbest_factor())
    }

    /// `nbest_factor` with 0 meaning "practically unlimited".
    pub fn effective_nbest_factor(&self) -> usize {
        if self.nbest_factor == 0 {
            1000
        } else {
            self.nbest_factor
        }
    }

    /// Checks scalar fields. Weights are checked against the feature layout
    /// by `FeatureLayout::resolve_weights`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.beam_threshold.is_finite() && self.beam_threshold != Score::INFINITY {
            return Err(invalid("beam_threshold", "must be a number"));
        }
        if self.beam_threshold < 0.0 {
            return Err(invalid("beam_threshold", "must not be negative"));
        }
        if !self.score_floor.is_finite() {
            return Err(invalid("score_floor", "must be finite"));
        }
        if self.max_phrase_length == 0 {
            return Err(invalid("max_phrase_length", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = DecoderConfig::from_json_str(
            r#"{ "stack_size": 10, "distortion_limit": -1, "unknown_word_policy": "drop" }"#,
        )
        .unwrap();
        assert_eq!(config.stack_size, 10);
        assert_eq!(config.distortion_limit, -1);
        assert_eq!(config.unknown_word_policy, UnknownWordPolicy::Drop);
        assert_eq!(config.max_options_per_span, 20);
    }

    #[test]
    fn negative_beam_is_rejected() {
        let err = DecoderConfig::from_json_str(r#"{ "beam_threshold": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "beam_threshold"));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            DecoderConfig::from_json_str("{ stack_size: "),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn zero_nbest_factor_means_unlimited() {
        let config = DecoderConfig {
            nbest_size: 5,
            nbest_factor: 0,
            ..DecoderConfig::default()
        };
        assert_eq!(config.arc_limit(), 5000);
    }
}
