use std::fmt;

use serde::{Deserialize, Serialize};

/// A simple type for integer ranges
///
/// All ranges follow the bed file range convention: 0-indexed, half-closed, [start,end)
///
/// SV records carry 1-based closed coordinates, so a record spanning `pos..=end` maps to the
/// range `[pos-1, end)`.
///
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn from_int(start: i64) -> Self {
        Self {
            start,
            end: start + 1,
        }
    }

    pub fn from_pair(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Convert a 1-based closed interval to the internal range convention
    pub fn from_one_based(pos: i64, end: i64) -> Self {
        Self::from_pair(pos - 1, end)
    }

    pub fn size(&self) -> i64 {
        self.end - self.start
    }

    /// Return true if the ranges intersect (adjacency does not count)
    ///
    pub fn intersect_range(&self, other: &IntRange) -> bool {
        other.end > self.start && other.start < self.end
    }

    /// Expand the range by `size` on both sides
    ///
    /// The start is not allowed to go below zero.
    ///
    pub fn expand_by(&mut self, size: i64) {
        self.start = std::cmp::max(self.start - size, 0);
        self.end += size;
    }
}

impl fmt::Debug for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}-{})", self.start, self.end)
    }
}

pub fn get_overlap_range(r1: &IntRange, r2: &IntRange) -> Option<IntRange> {
    if !r1.intersect_range(r2) {
        return None;
    }
    Some(IntRange {
        start: std::cmp::max(r1.start, r2.start),
        end: std::cmp::min(r1.end, r2.end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_range() {
        let r1 = IntRange::from_pair(1, 4);
        let r2 = IntRange::from_pair(4, 8);
        let r3 = IntRange::from_pair(3, 9);

        // Adjacent ranges don't intersect in either direction:
        assert!(!r1.intersect_range(&r2));
        assert!(!r2.intersect_range(&r1));

        assert!(r1.intersect_range(&r3));
        assert!(r3.intersect_range(&r2));
    }

    #[test]
    fn test_get_overlap_range() {
        let r1 = IntRange::from_one_based(1000, 2000);
        let r2 = IntRange::from_one_based(1500, 2500);
        assert_eq!(get_overlap_range(&r1, &r2), Some(IntRange::from_pair(1499, 2000)));

        let r3 = IntRange::from_one_based(2001, 2500);
        assert_eq!(get_overlap_range(&r1, &r3), None);
    }

    #[test]
    fn test_expand_by() {
        let mut r = IntRange::from_int(10);
        r.expand_by(50);
        assert_eq!(r, IntRange::from_pair(0, 61));
    }
}
