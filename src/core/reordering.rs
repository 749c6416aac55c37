// File: src/core/reordering.rs
use crate::core::span::Span;
use crate::core::types::{Score, WordId};
use serde::{Deserialize, Serialize};

/// Orientation of a phrase relative to the previously translated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Monotone,
    Swap,
    Discontinuous,
}

impl Orientation {
    pub const COUNT: usize = 3;

    /// The first phrase counts as monotone only when it starts the sentence.
    pub fn classify(prev: Option<Span>, curr: Span) -> Self {
        match prev {
            None if curr.start() == 0 => Orientation::Monotone,
            None => Orientation::Discontinuous,
            Some(prev) if prev.end() + 1 == curr.start() => Orientation::Monotone,
            Some(prev) if curr.end() + 1 == prev.start() => Orientation::Swap,
            Some(_) => Orientation::Discontinuous,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Orientation::Monotone => 0,
            Orientation::Swap => 1,
            Orientation::Discontinuous => 2,
        }
    }
}

/// Lexicalized reordering model consulted on every extension.
pub trait ReorderingModel: Send + Sync {
    fn num_scores(&self) -> usize;

    /// Scores moving from `prev` (None at sentence start) to `curr`.
    fn score(&self, prev: Option<Span>, curr: Span, source: &[WordId], target: &[WordId])
        -> Vec<Score>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_orientations() {
        assert_eq!(Orientation::classify(None, Span::new(0, 1)), Orientation::Monotone);
        assert_eq!(Orientation::classify(None, Span::new(2, 2)), Orientation::Discontinuous);
        let prev = Some(Span::new(2, 3));
        assert_eq!(Orientation::classify(prev, Span::new(4, 4)), Orientation::Monotone);
        assert_eq!(Orientation::classify(prev, Span::new(0, 1)), Orientation::Swap);
        assert_eq!(Orientation::classify(prev, Span::new(6, 6)), Orientation::Discontinuous);
        assert_eq!(Orientation::classify(prev, Span::new(0, 0)), Orientation::Discontinuous);
    }
}
