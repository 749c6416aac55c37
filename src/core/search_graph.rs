// File: src/core/search_graph.rs
use crate::core::span::Span;
use crate::core::types::{Score, WordId};
use serde::{Deserialize, Serialize};

/// One hypothesis of a finished search, copied out of the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchGraphNode {
    pub id: u32,
    /// Coverage count of the stack the hypothesis was inserted into.
    pub stack: usize,
    pub back: Option<u32>,
    /// Set for arcs: the hypothesis this one was recombined into.
    pub recombined_into: Option<u32>,
    pub span: Option<Span>,
    pub target: Vec<WordId>,
    /// Weighted score added by this hypothesis alone.
    pub transition_score: Score,
    pub total_score: Score,
    pub future_score: Score,
    pub covered: usize,
}

/// Everything that survived pruning in one sentence's search, plus arcs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchGraph {
    pub sentence: usize,
    pub nodes: Vec<SearchGraphNode>,
}

impl SearchGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that kept their place in a stack.
    pub fn retained(&self) -> impl Iterator<Item = &SearchGraphNode> {
        self.nodes.iter().filter(|n| n.recombined_into.is_none())
    }

    /// Nodes recombined into a better hypothesis.
    pub fn arcs(&self) -> impl Iterator<Item = &SearchGraphNode> {
        self.nodes.iter().filter(|n| n.recombined_into.is_some())
    }
}
