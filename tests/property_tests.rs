use proptest::prelude::*;
use repostdupe::engine::{Range, RangeSet};

/// Build a sorted, disjoint interval list from (gap, len) pairs, leaving at
/// least one uncovered integer between neighbors.
fn disjoint_ranges(segments: &[(u64, u64)]) -> Vec<(u64, u64)> {
    let mut out = Vec::with_capacity(segments.len());
    let mut next_lo: u64 = 0;
    for &(gap, len) in segments {
        let lo = next_lo + gap;
        let hi = lo + len;
        out.push((lo, hi));
        next_lo = hi + 2;
    }
    out
}

fn brute_contains(ranges: &[(u64, u64)], x: u64) -> bool {
    ranges.iter().any(|&(lo, hi)| lo <= x && x <= hi)
}

proptest! {
    #[test]
    fn test_contains_matches_brute_force(
        segments in prop::collection::vec((0u64..50, 0u64..30), 0..20),
        probe in 0u64..3000,
    ) {
        let pairs = disjoint_ranges(&segments);
        let set: RangeSet = pairs.iter().map(|&(lo, hi)| Range::new(lo, hi)).collect();

        prop_assert_eq!(set.contains(probe), brute_contains(&pairs, probe));
    }

    #[test]
    fn test_insert_preserves_sorted_disjoint_invariant(
        inserts in prop::collection::vec((0u64..2000, 0u64..100), 1..40),
    ) {
        let mut set = RangeSet::new();
        for &(lo, len) in &inserts {
            set.insert(Range::new(lo, lo + len));

            // Invariant: strictly ascending by lo, pairwise non-overlapping.
            for pair in set.ranges().windows(2) {
                prop_assert!(pair[0].lo < pair[1].lo);
                prop_assert!(pair[0].hi < pair[1].lo);
                prop_assert!(!pair[0].overlaps(&pair[1]));
            }
            for range in set.ranges() {
                prop_assert!(range.lo <= range.hi);
            }
        }
    }

    #[test]
    fn test_coverage_equals_union_of_inserts(
        inserts in prop::collection::vec((0u64..2000, 0u64..100), 1..40),
    ) {
        let mut set = RangeSet::new();
        for &(lo, len) in &inserts {
            set.insert(Range::new(lo, lo + len));
        }

        // Probe every boundary and its neighbors: the set must cover exactly
        // the union of the inserted ranges.
        for &(lo, len) in &inserts {
            let hi = lo + len;
            for probe in [lo.saturating_sub(1), lo, hi, hi + 1] {
                let expected = inserts
                    .iter()
                    .any(|&(l, n)| l <= probe && probe <= l + n);
                prop_assert_eq!(set.contains(probe), expected, "probe {}", probe);
            }
        }
    }

    #[test]
    fn test_insert_is_idempotent(
        inserts in prop::collection::vec((0u64..2000, 0u64..100), 1..20),
        repeat in (0u64..2000, 0u64..100),
    ) {
        let mut set = RangeSet::new();
        for &(lo, len) in &inserts {
            set.insert(Range::new(lo, lo + len));
        }

        let (lo, len) = repeat;
        set.insert(Range::new(lo, lo + len));
        let once = set.clone();
        set.insert(Range::new(lo, lo + len));
        prop_assert_eq!(set, once);
    }

    #[test]
    fn test_insert_never_loses_coverage(
        inserts in prop::collection::vec((0u64..2000, 0u64..100), 1..20),
        extra in (0u64..2000, 0u64..100),
    ) {
        let mut set = RangeSet::new();
        for &(lo, len) in &inserts {
            set.insert(Range::new(lo, lo + len));
        }

        let before: Vec<Range> = set.ranges().to_vec();
        set.insert(Range::new(extra.0, extra.0 + extra.1));

        // Every point covered before is still covered after.
        for range in before {
            for probe in [range.lo, range.hi] {
                prop_assert!(set.contains(probe));
            }
        }
    }
}
