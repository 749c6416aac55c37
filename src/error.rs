// File: src/error.rs
use crate::core::span::Span;

/// Problems detected while setting up a decoder. No hypothesis is ever
/// created under an invalid configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no weights given for feature `{0}`")]
    MissingWeights(String),
    #[error("weights given for unknown feature `{0}`")]
    UnknownProducer(String),
    #[error("feature `{producer}` has {expected} components but {found} weights were given")]
    WeightLengthMismatch {
        producer: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures that abort the decode of one sentence.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// A source position has no translation option even after the
    /// unknown-word fallback ran.
    #[error("sentence {sentence}: no translation option covers {span}")]
    UncoverableSpan { sentence: usize, span: Span },
    #[error("sentence {sentence}: search produced no hypothesis")]
    SearchExhausted { sentence: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures while writing or reading a search graph dump.
#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("search graph encoding failed: {0}")]
    Encode(#[from] bincode::Error),
    #[error("could not move search graph into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}
