// File: src/models/mod.rs
// In-memory reference implementations of the model traits.

pub mod ngram;
pub mod phrase_table;
pub mod reordering;

pub use ngram::BackoffLm;
pub use phrase_table::MemoryPhraseTable;
pub use reordering::MsdReorderingTable;
