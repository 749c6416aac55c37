// File: src/core/span.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive range `[start, end]` of source word positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Panics if `end < start`; spans are built by the decoder itself, never
    /// from user input.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(end >= start, "invalid span [{start}, {end}]");
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of words covered (always at least one).
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of words strictly between two disjoint spans.
    pub fn words_between(&self, other: &Span) -> usize {
        debug_assert!(!self.overlaps(other));
        if self.end < other.start {
            other.start - self.end - 1
        } else {
            self.start - other.end - 1
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.start, self.end)
    }
}

/// Jump width between the previously translated span and the next one.
/// From the root (no previous span) the jump is measured from position 0.
pub fn distortion_distance(prev: Option<Span>, curr: Span) -> usize {
    match prev {
        None => curr.start(),
        Some(prev) => (prev.end() as isize + 1 - curr.start() as isize).unsigned_abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_symmetric() {
        let a = Span::new(0, 2);
        let b = Span::new(2, 4);
        let c = Span::new(3, 4);
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(!a.overlaps(&c) && !c.overlaps(&a));
    }

    #[test]
    fn words_between_disjoint_spans() {
        let a = Span::new(0, 1);
        let b = Span::new(4, 5);
        assert_eq!(a.words_between(&b), 2);
        assert_eq!(b.words_between(&a), 2);
        assert_eq!(Span::new(0, 0).words_between(&Span::single(1)), 0);
    }

    #[test]
    fn distortion_from_root_and_between_spans() {
        assert_eq!(distortion_distance(None, Span::new(0, 1)), 0);
        assert_eq!(distortion_distance(None, Span::new(3, 3)), 3);
        assert_eq!(distortion_distance(Some(Span::new(0, 1)), Span::new(2, 2)), 0);
        assert_eq!(distortion_distance(Some(Span::new(4, 5)), Span::new(0, 1)), 6);
    }

    #[test]
    #[should_panic]
    fn reversed_span_is_rejected() {
        let _ = Span::new(3, 1);
    }
}
