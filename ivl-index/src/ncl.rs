//! Nested Containment List: a static, array-backed, pointer-free index.
//!
//! Construction sorts intervals into a containment forest (via a single
//! stack pass) then flattens that forest breadth-first into one `Vec`, with
//! each record's sublist sitting in a contiguous tail region pointed to by
//! `(sublist_offset, sublist_len)`. No interval is ever duplicated across
//! records, so every query is dedup-free by construction.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt::Debug;

use ivl_core::{IndexError, Interval, IntervalHandle};

use crate::traits::IntervalIndex;

struct Record<T> {
    handle: IntervalHandle<T>,
    sublist_offset: usize,
    sublist_len: usize,
}

pub struct Ncl<T> {
    records: Vec<Record<T>>,
    top_level_len: usize,
}

/// A still-nested build-time tree node, flattened away once the containment
/// forest is complete. Shared with [`crate::lcl`], which flattens the same
/// forest into independent per-depth layers instead of one self-referential array.
pub(crate) struct BuildNode<T> {
    pub(crate) handle: IntervalHandle<T>,
    pub(crate) children: Vec<BuildNode<T>>,
}

fn attach<T>(stack: &mut Vec<BuildNode<T>>, roots: &mut Vec<BuildNode<T>>, node: BuildNode<T>) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        roots.push(node);
    }
}

/// Sort order for forest construction: low ascending, then high
/// *descending* so that a would-be container always precedes the intervals
/// it strictly contains (the interval type's own `Ord` breaks low ties the
/// other way, which is right for the interval's natural order but wrong for
/// this stack-based nesting pass). Construction-only: the forest this
/// produces is re-sorted into natural order by [`sort_natural`] before it is
/// handed to a flattener, since the persisted record order has a different
/// requirement (see that function).
pub(crate) fn build_order<T: Ord + Clone + Debug>(a: &Interval<T>, b: &Interval<T>) -> Ordering {
    a.compare_low(b).then_with(|| b.compare_high(a))
}

/// Re-sorts every level of a just-built forest into the interval's own
/// natural order (low ascending, high ascending on ties).
///
/// Two siblings at the same forest level never strictly contain one
/// another, which (for siblings with distinct lows) already forces their
/// highs into ascending order as a consequence of that non-containment —
/// *except* at tied lows, where `strictly_contains` can never hold either
/// way regardless of high, so `build_order`'s construction-time tie-break
/// (high descending) survives into the finished forest unless undone here.
/// A flattened sublist/layer needs `high` monotonic for its
/// `compare_high_low`-based binary search (`partition_point` requires the
/// slice already be partitioned by its predicate), so this pass restores
/// that before any flattening happens.
fn sort_natural<T: Ord + Clone + Debug>(nodes: &mut [BuildNode<T>]) {
    nodes.sort_by(|a, b| a.handle.as_interval().cmp(b.handle.as_interval()));
    for node in nodes.iter_mut() {
        sort_natural(&mut node.children);
    }
}

pub(crate) fn build_forest<T: Ord + Clone + Debug>(mut handles: Vec<IntervalHandle<T>>) -> Vec<BuildNode<T>> {
    handles.sort_by(|a, b| build_order(a.as_interval(), b.as_interval()));

    let mut stack: Vec<BuildNode<T>> = Vec::new();
    let mut roots: Vec<BuildNode<T>> = Vec::new();

    for handle in handles {
        while let Some(top) = stack.last() {
            if top.handle.as_interval().strictly_contains(handle.as_interval()) {
                break;
            }
            let finished = stack.pop().unwrap();
            attach(&mut stack, &mut roots, finished);
        }
        stack.push(BuildNode { handle, children: Vec::new() });
    }
    while let Some(finished) = stack.pop() {
        attach(&mut stack, &mut roots, finished);
    }
    sort_natural(&mut roots);
    roots
}

/// Breadth-first flatten of the containment forest into one array, per §4.3:
/// all of one level's records are written before any of the next level's, so
/// a record's own children occupy one contiguous run.
fn flatten<T>(roots: Vec<BuildNode<T>>) -> (Vec<Record<T>>, usize) {
    let top_level_len = roots.len();
    let mut records = Vec::new();
    let mut current: VecDeque<BuildNode<T>> = roots.into_iter().collect();

    while !current.is_empty() {
        let level_start = records.len();
        for node in &current {
            records.push(Record {
                handle: node.handle.clone(),
                sublist_offset: 0,
                sublist_len: 0,
            });
        }
        let next_level_start = records.len();
        let mut next: VecDeque<BuildNode<T>> = VecDeque::new();
        for (i, node) in current.into_iter().enumerate() {
            let off = next_level_start + next.len();
            let len = node.children.len();
            records[level_start + i].sublist_offset = off;
            records[level_start + i].sublist_len = len;
            for child in node.children {
                next.push_back(child);
            }
        }
        current = next;
    }

    (records, top_level_len)
}

impl<T: Ord + Clone + Debug> Ncl<T> {
    pub fn build(intervals: impl IntoIterator<Item = IntervalHandle<T>>) -> Self {
        let handles: Vec<IntervalHandle<T>> = intervals.into_iter().collect();
        let forest = build_forest(handles);
        let (records, top_level_len) = flatten(forest);
        Ncl { records, top_level_len }
    }

    fn query_level(&self, offset: usize, len: usize, query: &Interval<T>, out: &mut Vec<IntervalHandle<T>>) {
        let slice = &self.records[offset..offset + len];
        let start = slice.partition_point(|r| r.handle.as_interval().compare_high_low(query) == Ordering::Less);
        for r in &slice[start..] {
            if r.handle.as_interval().compare_low_high(query) == Ordering::Greater {
                break;
            }
            out.push(r.handle.clone());
            self.query_level(r.sublist_offset, r.sublist_len, query, out);
        }
    }
}

impl<T: Ord + Clone + Debug> IntervalIndex<T> for Ncl<T> {
    fn find_overlaps_at<'a>(&'a self, p: &T) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        let point = Interval::point(p.clone());
        self.find_overlaps(&point)
    }

    fn find_overlaps<'a>(&'a self, query: &Interval<T>) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        let mut out = Vec::new();
        self.query_level(0, self.top_level_len, query, &mut out);
        Box::new(out.into_iter())
    }

    fn span(&self) -> Result<Interval<T>, IndexError> {
        let xs: Vec<Interval<T>> = self.records.iter().map(|r| r.handle.as_interval().clone()).collect();
        ivl_core::algebra::span(&xs)
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        Box::new(self.records.iter().map(|r| r.handle.clone()))
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn ivi(low: i32, high: i32) -> IntervalHandle<i32> {
        IntervalHandle::new(Interval::new(low, high, true, true).unwrap())
    }

    #[rstest]
    fn s2_build_and_query() {
        let ncl = Ncl::build([
            ivi(1, 10),
            ivi(2, 4),
            ivi(5, 9),
            ivi(6, 8),
            ivi(11, 12),
        ]);
        let q = Interval::new(3, 7, true, true).unwrap();
        let mut hits: Vec<(i32, i32)> = ncl.find_overlaps(&q).map(|h| (h.low, h.high)).collect();
        hits.sort();
        assert_eq!(hits, vec![(1, 10), (2, 4), (5, 9), (6, 8)]);

        let single = Interval::new(11, 11, true, true).unwrap();
        assert_eq!(ncl.count_overlaps(&single), 1);
    }

    #[rstest]
    fn empty_ncl_has_no_span() {
        let ncl: Ncl<i32> = Ncl::build([]);
        assert_eq!(ncl.span(), Err(IndexError::EmptyCollection));
        assert!(ncl.is_empty());
    }

    #[rstest]
    fn tied_low_siblings_keep_high_ascending_for_the_binary_search() {
        let ncl = Ncl::build([ivi(1, 10), ivi(1, 5)]);
        let hits: Vec<(i32, i32)> = ncl.find_overlaps_at(&7).map(|h| (h.low, h.high)).collect();
        assert_eq!(hits, vec![(1, 10)]);
    }

    #[rstest]
    fn nested_triple_containment() {
        let ncl = Ncl::build([ivi(0, 100), ivi(10, 50), ivi(20, 30)]);
        assert_eq!(ncl.len(), 3);
        let point_hit: Vec<(i32, i32)> = ncl.find_overlaps_at(&25).map(|h| (h.low, h.high)).collect();
        assert_eq!(point_hit.len(), 3);
    }
}
