//! Derived operations over an arbitrary collection of intervals: [`span`],
//! [`unique_endpoints`], [`maximum_depth`], and [`gaps`]. None of these are
//! index-specific; each index structure's `span()` etc. typically delegates
//! here, or maintains an O(1)/O(log n) structural shortcut to the same answer.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt::Debug;

use crate::errors::IndexError;
use crate::interval::{cmp_high, cmp_low, Interval};

/// The join (convex hull) of every interval in `xs`.
pub fn span<T: Ord + Clone + Debug>(xs: &[Interval<T>]) -> Result<Interval<T>, IndexError> {
    let mut it = xs.iter();
    let first = it.next().ok_or(IndexError::EmptyCollection)?;
    let mut acc = first.clone();
    for next in it {
        acc = acc.joined_span(next);
    }
    Ok(acc)
}

/// The sorted, deduplicated set of endpoint values appearing as either a low
/// or a high endpoint anywhere in `xs`.
pub fn unique_endpoints<T: Ord + Clone>(xs: &[Interval<T>]) -> Vec<T> {
    let mut values: Vec<T> = Vec::with_capacity(xs.len() * 2);
    for iv in xs {
        values.push(iv.low.clone());
        values.push(iv.high.clone());
    }
    values.sort();
    values.dedup();
    values
}

/// A min-heap entry ordered by the high-endpoint role (excluded precedes
/// included at equal values), so the heap's minimum is whichever active
/// interval ends soonest.
struct EndingSoonest<'a, T> {
    high: &'a T,
    high_included: bool,
}

impl<'a, T: Ord> PartialEq for EndingSoonest<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<'a, T: Ord> Eq for EndingSoonest<'a, T> {}
impl<'a, T: Ord> PartialOrd for EndingSoonest<'a, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<'a, T: Ord> Ord for EndingSoonest<'a, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_high(self.high, self.high_included, other.high, other.high_included)
    }
}

/// Sweeps `xs` and reports the largest number of intervals simultaneously
/// covering any single point, plus a witness sub-interval achieving that depth.
///
/// Returns `Err(IndexError::EmptyCollection)` if `xs` is empty — there is no
/// witness interval to report.
pub fn maximum_depth<T: Ord + Clone + Debug>(
    xs: &[Interval<T>],
) -> Result<(usize, Interval<T>), IndexError> {
    if xs.is_empty() {
        return Err(IndexError::EmptyCollection);
    }
    let mut sorted: Vec<&Interval<T>> = xs.iter().collect();
    sorted.sort_by(|a, b| a.compare_low(b));

    let mut heap: BinaryHeap<Reverse<EndingSoonest<'_, T>>> = BinaryHeap::new();
    let mut best_depth = 0usize;
    let mut witness: Option<Interval<T>> = None;

    for current in sorted {
        while let Some(Reverse(top)) = heap.peek() {
            if !interval_overlaps_point_parts(top.high, top.high_included, &current.low, current.low_included) {
                heap.pop();
            } else {
                break;
            }
        }
        heap.push(Reverse(EndingSoonest {
            high: &current.high,
            high_included: current.high_included,
        }));
        let depth = heap.len();
        if depth > best_depth {
            best_depth = depth;
            let top = &heap.peek().unwrap().0;
            witness = Some(Interval {
                low: current.low.clone(),
                high: top.high.clone(),
                low_included: current.low_included,
                high_included: top.high_included,
            });
        }
    }

    Ok((best_depth, witness.expect("non-empty xs always produces a witness")))
}

/// Whether a half-endpoint `(high, high_included)` covers the point `low`
/// (itself treated as a point whose own `low_included` matters only for the
/// tie at equal values — both must include the shared point for it to count).
fn interval_overlaps_point_parts<T: Ord>(high: &T, high_included: bool, low: &T, low_included: bool) -> bool {
    match high.cmp(low) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => high_included && low_included,
    }
}

/// Merges `xs` into the maximal disjoint runs it covers (the union), sorted
/// by low endpoint. Input need not be sorted or disjoint.
fn merge_runs<T: Ord + Clone>(xs: &[Interval<T>]) -> Vec<Interval<T>> {
    if xs.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<&Interval<T>> = xs.iter().collect();
    sorted.sort_by(|a, b| a.compare_low(b));

    let mut runs: Vec<Interval<T>> = Vec::new();
    let mut cur = sorted[0].clone();
    for next in &sorted[1..] {
        if touches_or_overlaps(&cur.high, cur.high_included, &next.low, next.low_included) {
            if cmp_high(&next.high, next.high_included, &cur.high, cur.high_included) == Ordering::Greater {
                cur.high = next.high.clone();
                cur.high_included = next.high_included;
            }
        } else {
            runs.push(cur);
            cur = (*next).clone();
        }
    }
    runs.push(cur);
    runs
}

/// Whether a run ending at `(high, high_included)` leaves no gap before a run
/// starting at `(low, low_included)` — i.e. they should be merged.
fn touches_or_overlaps<T: Ord>(high: &T, high_included: bool, low: &T, low_included: bool) -> bool {
    match high.cmp(low) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => high_included || low_included,
    }
}

fn interior_gap<T: Ord + Clone>(left: &Interval<T>, right: &Interval<T>) -> Interval<T> {
    Interval {
        low: left.high.clone(),
        high: right.low.clone(),
        low_included: !left.high_included,
        high_included: !right.low_included,
    }
}

/// The gaps between the covered runs of `xs`: the complement of `union(xs)`.
///
/// Every gap's endpoints are the meeting endpoints of the two intervals that
/// bound it, with inclusion inverted (per §3/§4.1). When `span` is given, the
/// result is clipped to `span` and a leading and/or trailing gap is reported
/// at the span's own boundary (un-inverted, since that boundary belongs to the
/// query window, not to a stored interval) — including the entire span as a
/// single gap when `xs` is empty.
pub fn gaps<T: Ord + Clone + Debug>(xs: &[Interval<T>], span: Option<&Interval<T>>) -> Vec<Interval<T>> {
    let runs = merge_runs(xs);

    let Some(span) = span else {
        return runs.windows(2).map(|w| interior_gap(&w[0], &w[1])).collect();
    };

    let clipped: Vec<Interval<T>> = runs
        .iter()
        .filter(|r| r.overlaps(span))
        .map(|r| r.overlap(span))
        .collect();

    if clipped.is_empty() {
        return vec![span.clone()];
    }

    let mut out = Vec::with_capacity(clipped.len() + 1);

    let first = &clipped[0];
    if cmp_low(&span.low, span.low_included, &first.low, first.low_included) == Ordering::Less {
        out.push(Interval {
            low: span.low.clone(),
            high: first.low.clone(),
            low_included: span.low_included,
            high_included: !first.low_included,
        });
    }

    for w in clipped.windows(2) {
        out.push(interior_gap(&w[0], &w[1]));
    }

    let last = clipped.last().unwrap();
    if cmp_high(&last.high, last.high_included, &span.high, span.high_included) == Ordering::Less {
        out.push(Interval {
            low: last.high.clone(),
            high: span.high.clone(),
            low_included: !last.high_included,
            high_included: span.high_included,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn iv(low: i32, high: i32, li: bool, hi: bool) -> Interval<i32> {
        Interval::new(low, high, li, hi).unwrap()
    }

    #[rstest]
    fn maximum_depth_matches_witness_example() {
        let xs = vec![iv(0, 4, true, true), iv(1, 3, true, true), iv(2, 5, true, true), iv(6, 7, true, true)];
        let (depth, witness) = maximum_depth(&xs).unwrap();
        assert_eq!(depth, 3);
        assert_eq!(witness.low, 2);
        assert_eq!(witness.high, 3);
    }

    #[rstest]
    fn maximum_depth_on_empty_is_an_error() {
        let xs: Vec<Interval<i32>> = vec![];
        assert_eq!(maximum_depth(&xs), Err(IndexError::EmptyCollection));
    }

    #[rstest]
    fn gaps_without_span() {
        // half-open intervals: [1,3) and [5,7) leave exactly [3,5) uncovered.
        let xs = vec![iv(1, 3, true, false), iv(5, 7, true, false)];
        let g = gaps(&xs, None);
        assert_eq!(g.len(), 1);
        assert_eq!(g[0].low, 3);
        assert_eq!(g[0].high, 5);
        assert!(g[0].low_included);
        assert!(!g[0].high_included);
    }

    #[rstest]
    fn touching_half_open_intervals_merge_without_a_gap() {
        let xs = vec![iv(1, 3, true, false), iv(3, 5, true, false)];
        assert!(gaps(&xs, None).is_empty());
    }

    #[rstest]
    fn gaps_with_span_reports_leading_and_trailing() {
        let xs = vec![iv(3, 5, true, false)];
        let window = iv(0, 10, true, false);
        let g = gaps(&xs, Some(&window));
        assert_eq!(g.len(), 2);
        assert_eq!((g[0].low, g[0].high), (0, 3));
        assert_eq!((g[1].low, g[1].high), (5, 10));
    }

    #[rstest]
    fn gaps_with_span_on_empty_collection_is_the_whole_span() {
        let xs: Vec<Interval<i32>> = vec![];
        let window = iv(0, 10, true, true);
        let g = gaps(&xs, Some(&window));
        assert_eq!(g, vec![window]);
    }

    #[rstest]
    fn unique_endpoints_is_sorted_and_deduplicated() {
        let xs = vec![iv(1, 5, true, true), iv(5, 9, true, true), iv(1, 3, true, true)];
        assert_eq!(unique_endpoints(&xs), vec![1, 3, 5, 9]);
    }

    #[rstest]
    fn span_of_all_intervals() {
        let xs = vec![iv(1, 5, true, false), iv(10, 12, false, true)];
        let s = span(&xs).unwrap();
        assert_eq!((s.low, s.high), (1, 12));
    }
}
