// File: src/core/phrase_table.rs
use crate::core::types::{Phrase, Score, WordId};
use serde::{Deserialize, Serialize};

/// One target-side alternative for a source phrase, with the table's raw
/// log-domain scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseCandidate {
    pub target: Phrase,
    pub scores: Vec<Score>,
}

/// Read-only phrase table lookup.
///
/// Implementations are shared between concurrently decoded sentences and
/// must return the same ranked list for the same source every time.
pub trait PhraseTable: Send + Sync {
    /// Number of translation-model components per candidate.
    fn num_scores(&self) -> usize;

    /// Candidates for `source`, best first by the table's own estimate.
    fn lookup(&self, source: &[WordId]) -> Vec<PhraseCandidate>;

    /// Whether any entry starts with `prefix`. When this is false no longer
    /// source span starting with `prefix` is looked up.
    fn has_prefix(&self, _prefix: &[WordId]) -> bool {
        true
    }
}
