//! Layered Containment List: the same containment forest as [`crate::ncl`],
//! flattened into independent per-depth layers (each a separate sorted
//! `Vec`) instead of one self-referential array. A record's forward pointer
//! is a half-open index range into the *next* layer's `Vec`, not an offset
//! into itself, which is what makes each layer individually cache-sequential.

use std::cmp::Ordering;
use std::fmt::Debug;

use ivl_core::{IndexError, Interval, IntervalHandle};

use crate::ncl::{build_forest, BuildNode};
use crate::traits::IntervalIndex;

struct Record<T> {
    handle: IntervalHandle<T>,
    /// Half-open range into the next layer's `Vec`, or `None` for a leaf.
    next_range: Option<(usize, usize)>,
}

pub struct Lcl<T> {
    layers: Vec<Vec<Record<T>>>,
}

fn build_layers<T>(roots: Vec<BuildNode<T>>) -> Vec<Vec<Record<T>>> {
    let mut layers = Vec::new();
    let mut current = roots;

    while !current.is_empty() {
        let mut layer = Vec::with_capacity(current.len());
        let mut next_level: Vec<BuildNode<T>> = Vec::new();
        for node in current {
            let start = next_level.len();
            for child in node.children {
                next_level.push(child);
            }
            let end = next_level.len();
            let next_range = if end > start { Some((start, end)) } else { None };
            layer.push(Record { handle: node.handle, next_range });
        }
        layers.push(layer);
        current = next_level;
    }
    layers
}

impl<T: Ord + Clone + Debug> Lcl<T> {
    pub fn build(intervals: impl IntoIterator<Item = IntervalHandle<T>>) -> Self {
        let handles: Vec<IntervalHandle<T>> = intervals.into_iter().collect();
        let forest = build_forest(handles);
        Lcl { layers: build_layers(forest) }
    }

    /// Number of antichain layers (the forest's depth).
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Two binary searches narrow `range` down to the records of `layer_idx`
    /// that can possibly overlap `query`: one for the first record whose high
    /// reaches `query.low`, one for the last record whose low still reaches
    /// `query.high`. Every record strictly between genuinely overlaps, so no
    /// further per-record check is needed before recursing into its next layer.
    fn query_layer(&self, layer_idx: usize, range: (usize, usize), query: &Interval<T>, out: &mut Vec<IntervalHandle<T>>) {
        let (lo, hi) = range;
        if lo >= hi || layer_idx >= self.layers.len() {
            return;
        }
        let layer = &self.layers[layer_idx];
        let slice = &layer[lo..hi];

        let start_offset = slice.partition_point(|r| r.handle.as_interval().compare_high_low(query) == Ordering::Less);
        let narrowed = &slice[start_offset..];
        let end_offset = narrowed.partition_point(|r| r.handle.as_interval().compare_low_high(query) != Ordering::Greater);

        let start = lo + start_offset;
        let end = start + end_offset;

        for r in &layer[start..end] {
            out.push(r.handle.clone());
            if let Some(next_range) = r.next_range {
                self.query_layer(layer_idx + 1, next_range, query, out);
            }
        }
    }
}

impl<T: Ord + Clone + Debug> IntervalIndex<T> for Lcl<T> {
    fn find_overlaps_at<'a>(&'a self, p: &T) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        let point = Interval::point(p.clone());
        self.find_overlaps(&point)
    }

    fn find_overlaps<'a>(&'a self, query: &Interval<T>) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        let mut out = Vec::new();
        if let Some(layer0) = self.layers.first() {
            self.query_layer(0, (0, layer0.len()), query, &mut out);
        }
        Box::new(out.into_iter())
    }

    fn span(&self) -> Result<Interval<T>, IndexError> {
        let xs: Vec<Interval<T>> = self.iter().map(|h| h.as_interval().clone()).collect();
        ivl_core::algebra::span(&xs)
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        Box::new(self.layers.iter().flat_map(|layer| layer.iter().map(|r| r.handle.clone())))
    }

    fn len(&self) -> usize {
        self.layers.iter().map(|l| l.len()).sum()
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
    fn s3_layers_and_query() {
        let lcl = Lcl::build([
            ivi(1, 20),
            ivi(2, 8),
            ivi(3, 5),
            ivi(10, 18),
            ivi(25, 30),
        ]);
        assert_eq!(lcl.layer_count(), 3);
        assert_eq!(lcl.len(), 5);

        let q = Interval::new(4, 4, true, true).unwrap();
        let mut hits: Vec<(i32, i32)> = lcl.find_overlaps(&q).map(|h| (h.low, h.high)).collect();
        hits.sort();
        assert_eq!(hits, vec![(1, 20), (2, 8), (3, 5)]);
    }

    #[rstest]
    fn tied_low_siblings_keep_high_ascending_for_the_binary_search() {
        let lcl = Lcl::build([ivi(1, 10), ivi(1, 5)]);
        let hits: Vec<(i32, i32)> = lcl.find_overlaps_at(&7).map(|h| (h.low, h.high)).collect();
        assert_eq!(hits, vec![(1, 10)]);
    }

    #[rstest]
    fn find_overlap_hits_a_deeply_nested_record() {
        let lcl = Lcl::build([ivi(0, 100), ivi(10, 90), ivi(20, 80), ivi(40, 60)]);
        let q = Interval::new(50, 50, true, true).unwrap();
        assert!(lcl.find_overlap(&q).is_some());
    }

    #[rstest]
    fn disjoint_intervals_form_a_single_layer() {
        let lcl = Lcl::build([ivi(0, 5), ivi(10, 15), ivi(20, 25)]);
        assert_eq!(lcl.layer_count(), 1);
        assert_eq!(lcl.count_overlaps(&Interval::new(12, 12, true, true).unwrap()), 1);
    }

    #[rstest]
    fn empty_lcl_has_no_span() {
        let lcl: Lcl<i32> = Lcl::build([]);
        assert_eq!(lcl.span(), Err(IndexError::EmptyCollection));
        assert!(lcl.is_empty());
        assert!(lcl.find_overlap(&Interval::new(0, 1, true, true).unwrap()).is_none());
    }
}
