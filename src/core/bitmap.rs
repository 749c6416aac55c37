// File: src/core/bitmap.rs
use crate::core::span::Span;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::fmt;

const BLOCK_BITS: usize = 64;

/// Which source positions a hypothesis has translated.
///
/// Bitmaps are values: extending one produces a new bitmap and the old one is
/// left untouched, so a hypothesis never sees its coverage shrink.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoverageBitmap {
    blocks: SmallVec<[u64; 2]>,
    len: usize,
    covered: usize,
}

impl CoverageBitmap {
    /// An empty bitmap for a sentence of `len` words.
    pub fn new(len: usize) -> Self {
        let blocks = len.div_ceil(BLOCK_BITS).max(1);
        Self {
            blocks: smallvec![0; blocks],
            len,
            covered: 0,
        }
    }

    /// Sentence length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of covered positions.
    pub fn count(&self) -> usize {
        self.covered
    }

    pub fn is_complete(&self) -> bool {
        self.covered == self.len
    }

    pub fn is_set(&self, pos: usize) -> bool {
        debug_assert!(pos < self.len);
        self.blocks[pos / BLOCK_BITS] & (1u64 << (pos % BLOCK_BITS)) != 0
    }

    pub fn overlaps(&self, span: Span) -> bool {
        (span.start()..=span.end()).any(|pos| self.is_set(pos))
    }

    /// Returns the union of `self` and `span`.
    ///
    /// Panics when the span overlaps already covered words or runs past the
    /// sentence: applying such a span is a bug in the caller, not an input
    /// error.
    pub fn with_span(&self, span: Span) -> Self {
        assert!(span.end() < self.len, "span {span} outside sentence of {}", self.len);
        assert!(!self.overlaps(span), "span {span} overlaps coverage {self:?}");
        let mut next = self.clone();
        for pos in span.start()..=span.end() {
            next.blocks[pos / BLOCK_BITS] |= 1u64 << (pos % BLOCK_BITS);
        }
        next.covered += span.len();
        next
    }

    /// Leftmost untranslated position.
    pub fn first_gap(&self) -> Option<usize> {
        (0..self.len).find(|&pos| !self.is_set(pos))
    }

    /// Maximal runs of untranslated positions, left to right.
    pub fn gaps(&self) -> Gaps<'_> {
        Gaps { bitmap: self, pos: 0 }
    }
}

impl fmt::Debug for CoverageBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in 0..self.len {
            f.write_str(if self.is_set(pos) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Iterator over the uncovered spans of a bitmap.
pub struct Gaps<'a> {
    bitmap: &'a CoverageBitmap,
    pos: usize,
}

impl Iterator for Gaps<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        let len = self.bitmap.len();
        while self.pos < len && self.bitmap.is_set(self.pos) {
            self.pos += 1;
        }
        if self.pos >= len {
            return None;
        }
        let start = self.pos;
        while self.pos < len && !self.bitmap.is_set(self.pos) {
            self.pos += 1;
        }
        Some(Span::new(start, self.pos - 1))
    }
}
