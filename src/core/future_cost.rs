// File: src/core/future_cost.rs
use crate::core::bitmap::CoverageBitmap;
use crate::core::span::Span;
use crate::core::types::Score;

/// Best known score for translating each source span in isolation.
///
/// Filled once per sentence from the translation options and never changed
/// while searching. The values rank partial hypotheses for pruning; they are
/// neither an upper nor a lower bound on the real completion score.
#[derive(Debug, Clone, PartialEq)]
pub struct FutureCostMatrix {
    size: usize,
    cells: Vec<Score>,
}

impl FutureCostMatrix {
    /// A matrix with every cell at `-inf`.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Score::NEG_INFINITY; size * size],
        }
    }

    /// Runs the interval recurrence over direct per-span scores.
    ///
    /// `direct` yields `(span, score)` for every translation option; the best
    /// score per span seeds the table, then every span takes the best of its
    /// direct score and any split into two adjacent sub-spans.
    pub fn compute(size: usize, direct: impl IntoIterator<Item = (Span, Score)>) -> Self {
        let mut matrix = Self::new(size);
        for (span, score) in direct {
            if score > matrix.get(span.start(), span.end()) {
                matrix.set(span.start(), span.end(), score);
            }
        }
        for width in 1..size {
            for start in 0..size - width {
                let end = start + width;
                for split in start..end {
                    let joined = matrix.get(start, split) + matrix.get(split + 1, end);
                    if joined > matrix.get(start, end) {
                        matrix.set(start, end, joined);
                    }
                }
            }
        }
        matrix
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, start: usize, end: usize) -> Score {
        debug_assert!(start <= end && end < self.size);
        self.cells[start * self.size + end]
    }

    fn set(&mut self, start: usize, end: usize, score: Score) {
        self.cells[start * self.size + end] = score;
    }

    /// Estimated score for the words `coverage` still leaves untranslated:
    /// the sum over all maximal gaps.
    pub fn estimate(&self, coverage: &CoverageBitmap) -> Score {
        coverage.gaps().map(|gap| self.get(gap.start(), gap.end())).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_beat_weak_direct_scores() {
        let matrix = FutureCostMatrix::compute(
            3,
            [
                (Span::single(0), -1.0),
                (Span::single(1), -1.0),
                (Span::single(2), -1.0),
                (Span::new(0, 1), -5.0),
                (Span::new(0, 2), -1.5),
            ],
        );
        assert_eq!(matrix.get(0, 1), -2.0);
        assert_eq!(matrix.get(1, 2), -2.0);
        assert_eq!(matrix.get(0, 2), -1.5);
    }

    #[test]
    fn best_direct_option_wins_per_span() {
        let matrix = FutureCostMatrix::compute(1, [(Span::single(0), -4.0), (Span::single(0), -2.0)]);
        assert_eq!(matrix.get(0, 0), -2.0);
    }

    #[test]
    fn estimate_sums_gaps() {
        let matrix = FutureCostMatrix::compute(
            4,
            (0..4).map(|i| (Span::single(i), -(i as Score) - 1.0)),
        );
        let coverage = CoverageBitmap::new(4).with_span(Span::new(1, 2));
        assert_eq!(matrix.estimate(&coverage), -1.0 + -4.0);
        let full = coverage.with_span(Span::single(0)).with_span(Span::single(3));
        assert_eq!(matrix.estimate(&full), 0.0);
    }

    #[test]
    fn uncovered_span_stays_negative_infinity() {
        let matrix = FutureCostMatrix::compute(2, [(Span::single(0), -1.0)]);
        assert_eq!(matrix.get(1, 1), Score::NEG_INFINITY);
        assert_eq!(matrix.get(0, 1), Score::NEG_INFINITY);
    }
}
