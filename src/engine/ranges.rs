//! Scanned-range bookkeeping for channel histories.
//!
//! A [`RangeSet`] records which spans of a channel's message-ID space have
//! already been scanned, so that repeat scans can skip covered messages. The
//! set is kept sorted and disjoint at all times; membership tests are
//! O(log k) over the k stored ranges.

use serde::{Deserialize, Serialize};

/// A closed interval `[lo, hi]` of message IDs.
///
/// Message IDs are platform snowflakes: monotonically increasing with
/// creation time but not contiguous. A single message is representable as
/// `[n, n]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u64, u64)", into = "(u64, u64)")]
pub struct Range {
    /// Inclusive lower bound.
    pub lo: u64,
    /// Inclusive upper bound.
    pub hi: u64,
}

impl Range {
    /// Create a range spanning both endpoints, in either order.
    #[must_use]
    pub fn new(a: u64, b: u64) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    /// Whether `id` falls within this range (inclusive on both ends).
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.lo <= id && id <= self.hi
    }

    /// Whether two ranges share at least one integer.
    ///
    /// Adjacency without a shared point (`[5,10]` and `[11,16]`) does not
    /// count as overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Range) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }
}

impl From<(u64, u64)> for Range {
    fn from((a, b): (u64, u64)) -> Self {
        Self::new(a, b)
    }
}

impl From<Range> for (u64, u64) {
    fn from(r: Range) -> Self {
        (r.lo, r.hi)
    }
}

/// An ordered set of disjoint [`Range`]s.
///
/// Invariant between mutations: ranges are strictly ascending by `lo` and
/// pairwise non-overlapping. Serialized as `[[lo, hi], ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeSet {
    ranges: Vec<Range>,
}

impl RangeSet {
    /// Create an empty range set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is covered by any stored range.
    ///
    /// Binary search over the sorted, disjoint list.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        // First range that could still contain id: the one with hi >= id.
        let idx = self.ranges.partition_point(|r| r.hi < id);
        self.ranges.get(idx).is_some_and(|r| r.lo <= id)
    }

    /// Add coverage for `new`, merging with every existing range it overlaps.
    ///
    /// Overlap is inclusive: ranges sharing a single endpoint merge, but
    /// ranges separated by a gap of at least one integer do not, unless `new`
    /// itself bridges the gap. Inserting a range already fully covered is a
    /// no-op.
    pub fn insert(&mut self, new: Range) {
        // Touched ranges form the contiguous run [start, end): those with
        // hi >= new.lo and lo <= new.hi.
        let start = self.ranges.partition_point(|r| r.hi < new.lo);
        let end = self.ranges.partition_point(|r| r.lo <= new.hi);

        if start < end {
            let merged = Range {
                lo: self.ranges[start].lo.min(new.lo),
                hi: self.ranges[end - 1].hi.max(new.hi),
            };
            self.ranges.splice(start..end, std::iter::once(merged));
        } else {
            // No overlap: start is the position that keeps the list sorted.
            self.ranges.insert(start, new);
        }

        debug_assert!(self.is_sorted_disjoint());
    }

    /// The stored ranges, ascending by `lo`.
    #[must_use]
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Number of disjoint ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether no coverage has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn is_sorted_disjoint(&self) -> bool {
        self.ranges
            .windows(2)
            .all(|w| w[0].lo < w[1].lo && !w[0].overlaps(&w[1]))
    }
}

impl FromIterator<Range> for RangeSet {
    fn from_iter<T: IntoIterator<Item = Range>>(iter: T) -> Self {
        let mut set = Self::new();
        for r in iter {
            set.insert(r);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(u64, u64)]) -> RangeSet {
        pairs.iter().map(|&(lo, hi)| Range::new(lo, hi)).collect()
    }

    fn pairs(set: &RangeSet) -> Vec<(u64, u64)> {
        set.ranges().iter().map(|r| (r.lo, r.hi)).collect()
    }

    #[test]
    fn test_contains_on_boundaries() {
        let s = set(&[(3, 12), (13, 18)]);
        assert!(s.contains(3));
        assert!(s.contains(12));
        assert!(s.contains(13));
        assert!(s.contains(18));
        assert!(!s.contains(2));
        assert!(!s.contains(19));
    }

    #[test]
    fn test_contains_in_gap() {
        let s = set(&[(0, 1), (3, 5)]);
        assert!(!s.contains(2));
    }

    #[test]
    fn test_contains_empty() {
        assert!(!RangeSet::new().contains(7));
    }

    #[test]
    fn test_insert_bridges_middle_gap() {
        let mut s = set(&[(5, 10), (15, 20), (25, 30)]);
        s.insert(Range::new(12, 16));
        assert_eq!(pairs(&s), vec![(5, 10), (12, 20), (25, 30)]);
    }

    #[test]
    fn test_insert_spans_two_ranges() {
        let mut s = set(&[(5, 10), (15, 20), (25, 30)]);
        s.insert(Range::new(16, 28));
        assert_eq!(pairs(&s), vec![(5, 10), (15, 30)]);
    }

    #[test]
    fn test_insert_before_all() {
        let mut s = set(&[(4, 8), (10, 15)]);
        s.insert(Range::new(1, 3));
        assert_eq!(pairs(&s), vec![(1, 3), (4, 8), (10, 15)]);
    }

    #[test]
    fn test_insert_after_all() {
        let mut s = set(&[(4, 8)]);
        s.insert(Range::new(20, 25));
        assert_eq!(pairs(&s), vec![(4, 8), (20, 25)]);
    }

    #[test]
    fn test_insert_equal_range_is_noop() {
        let mut s = set(&[(4, 8), (10, 15)]);
        s.insert(Range::new(4, 8));
        assert_eq!(pairs(&s), vec![(4, 8), (10, 15)]);
    }

    #[test]
    fn test_insert_subset_is_noop() {
        let mut s = set(&[(4, 20)]);
        s.insert(Range::new(6, 9));
        assert_eq!(pairs(&s), vec![(4, 20)]);
    }

    #[test]
    fn test_adjacent_ranges_do_not_merge() {
        // A gap of one integer (11) keeps the ranges apart.
        let mut s = set(&[(5, 10)]);
        s.insert(Range::new(12, 16));
        assert_eq!(pairs(&s), vec![(5, 10), (12, 16)]);
    }

    #[test]
    fn test_shared_endpoint_merges() {
        let mut s = set(&[(5, 10)]);
        s.insert(Range::new(10, 16));
        assert_eq!(pairs(&s), vec![(5, 16)]);
    }

    #[test]
    fn test_touching_without_gap_merges() {
        // [5,10] and [11,16] share no integer, but [5,11] and [11,16] do.
        let mut s = set(&[(5, 11)]);
        s.insert(Range::new(11, 16));
        assert_eq!(pairs(&s), vec![(5, 16)]);
    }

    #[test]
    fn test_singleton_ranges() {
        let mut s = RangeSet::new();
        s.insert(Range::new(7, 7));
        assert!(s.contains(7));
        assert!(!s.contains(6));
        assert!(!s.contains(8));

        s.insert(Range::new(7, 9));
        assert_eq!(pairs(&s), vec![(7, 9)]);
    }

    #[test]
    fn test_insert_swallows_many() {
        let mut s = set(&[(1, 2), (4, 5), (7, 8), (10, 11)]);
        s.insert(Range::new(2, 10));
        assert_eq!(pairs(&s), vec![(1, 11)]);
    }

    #[test]
    fn test_range_new_normalizes() {
        let r = Range::new(9, 3);
        assert_eq!((r.lo, r.hi), (3, 9));
    }

    #[test]
    fn test_serde_round_trip_as_pairs() {
        let s = set(&[(5, 10), (15, 20)]);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "[[5,10],[15,20]]");
        let back: RangeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
