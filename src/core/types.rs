// File: src/core/types.rs
use smallvec::SmallVec;

/// A unique identifier for an interned surface word.
pub type WordId = u32;

/// Log-domain score. All feature values and weights share this type.
pub type Score = f32;

/// A sequence of words on either side of a phrase pair.
/// Most phrases are short enough to stay inline.
pub type Phrase = SmallVec<[WordId; 6]>;

/// Default floor applied to raw log-scores coming out of any model.
pub const DEFAULT_SCORE_FLOOR: Score = -100.0;

/// Clamps a raw model score so that `-inf` and `NaN` cannot leak into
/// comparisons between hypotheses.
pub fn floor_score(score: Score, floor: Score) -> Score {
    if score.is_nan() || score < floor {
        floor
    } else {
        score
    }
}

/// Orders two scores descending with a total order.
pub fn cmp_desc(a: Score, b: Score) -> std::cmp::Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_clamps_degenerate_values() {
        assert_eq!(floor_score(f32::NEG_INFINITY, -100.0), -100.0);
        assert_eq!(floor_score(f32::NAN, -100.0), -100.0);
        assert_eq!(floor_score(-250.0, -100.0), -100.0);
        assert_eq!(floor_score(-2.5, -100.0), -2.5);
    }

    #[test]
    fn descending_order_puts_best_first() {
        let mut scores = vec![-3.0, -1.0, -2.0];
        scores.sort_by(|a, b| cmp_desc(*a, *b));
        assert_eq!(scores, vec![-1.0, -2.0, -3.0]);
    }
}
