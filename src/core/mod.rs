// File: src/core/mod.rs
pub mod bitmap;
pub mod config;
pub mod engine;
pub mod features;
pub mod future_cost;
pub mod hypothesis;
pub mod lm;
pub mod manager;
pub mod nbest;
pub mod options;
pub mod phrase_table;
pub mod reordering;
pub mod score;
pub mod search_graph;
pub mod span;
pub mod stack;
pub mod types;
pub mod vocab;
