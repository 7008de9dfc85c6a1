//! The query surface shared by all four index structures.
//!
//! Point and interval queries are separate methods rather than overloads of
//! one name, since Rust does not dispatch on argument type the way the
//! distilled interface sketch implies; `_at` names the point-query member of
//! each pair.

use ivl_core::{IndexError, Interval, IntervalHandle};

pub trait IntervalIndex<T: Ord + Clone> {
    /// Every stored interval overlapping the single point `p`.
    fn find_overlaps_at<'a>(&'a self, p: &T) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a>;

    /// Every stored interval overlapping `query`, deduplicated by reference.
    fn find_overlaps<'a>(&'a self, query: &Interval<T>) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a>;

    /// The first stored interval (by the implementation's own order) overlapping `p`.
    fn find_overlap_at(&self, p: &T) -> Option<IntervalHandle<T>> {
        self.find_overlaps_at(p).next()
    }

    /// The first stored interval overlapping `query`.
    fn find_overlap(&self, query: &Interval<T>) -> Option<IntervalHandle<T>> {
        self.find_overlaps(query).next()
    }

    /// `|find_overlaps(query)|`, without requiring the caller to collect it.
    fn count_overlaps(&self, query: &Interval<T>) -> usize {
        self.find_overlaps(query).count()
    }

    /// The join of every stored interval. `Err(IndexError::EmptyCollection)` if empty.
    fn span(&self) -> Result<Interval<T>, IndexError>;

    /// Every stored interval, in the implementation's own order (not necessarily sorted).
    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
