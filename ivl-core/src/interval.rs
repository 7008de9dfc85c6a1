use std::cmp::Ordering;
use std::fmt::Debug;

use crate::errors::IndexError;

/// A closed-or-open interval `[low, high]` over an ordered endpoint domain `T`.
///
/// Each endpoint carries its own inclusion flag, so `Interval` can express any
/// of the four combinations: `[low, high]`, `(low, high)`, `[low, high)`, `(low, high]`.
/// A value is a *point interval* when `low == high` and both endpoints are included.
///
/// Construct with [`Interval::new`], which validates `low < high` (or the point
/// case) rather than leaving an invalid interval as undefined behavior.
#[derive(Debug, Clone)]
pub struct Interval<T> {
    pub low: T,
    pub high: T,
    pub low_included: bool,
    pub high_included: bool,
}

impl<T: Ord + Clone + Debug> Interval<T> {
    /// Build a new interval, rejecting anything that isn't valid per the data model:
    /// `low < high`, or `low == high` with both endpoints included (a point).
    pub fn new(low: T, high: T, low_included: bool, high_included: bool) -> Result<Self, IndexError> {
        let iv = Interval {
            low,
            high,
            low_included,
            high_included,
        };
        if iv.is_valid() {
            Ok(iv)
        } else {
            Err(IndexError::InvalidInterval {
                low: format!("{:?}", iv.low),
                high: format!("{:?}", iv.high),
                low_included: iv.low_included,
                high_included: iv.high_included,
            })
        }
    }

    /// A degenerate interval covering exactly one point.
    pub fn point(value: T) -> Self {
        Interval {
            low: value.clone(),
            high: value,
            low_included: true,
            high_included: true,
        }
    }

    /// `low < high`, or `low == high` with both endpoints included.
    pub fn is_valid(&self) -> bool {
        match self.low.cmp(&self.high) {
            Ordering::Less => true,
            Ordering::Equal => self.low_included && self.high_included,
            Ordering::Greater => false,
        }
    }

    /// Total order on the low endpoint alone: value, tie-broken so an included
    /// endpoint precedes an excluded one at the same value.
    pub fn compare_low(&self, other: &Self) -> Ordering {
        cmp_low(&self.low, self.low_included, &other.low, other.low_included)
    }

    /// Total order on the high endpoint alone: value, tie-broken so an excluded
    /// endpoint precedes an included one at the same value.
    pub fn compare_high(&self, other: &Self) -> Ordering {
        cmp_high(&self.high, self.high_included, &other.high, other.high_included)
    }

    /// Compares `self`'s low endpoint against `other`'s high endpoint. Used (in
    /// both directions) to decide overlap: a tie collapses to `Equal` when the
    /// shared point is covered by both intervals, and to `Greater` (no overlap)
    /// otherwise.
    pub fn compare_low_high(&self, other: &Self) -> Ordering {
        match self.low.cmp(&other.high) {
            Ordering::Equal => {
                if self.low_included && other.high_included {
                    Ordering::Equal
                } else {
                    Ordering::Greater
                }
            }
            ord => ord,
        }
    }

    /// Compares `self`'s high endpoint against `other`'s low endpoint; the mirror
    /// of [`compare_low_high`](Self::compare_low_high).
    pub fn compare_high_low(&self, other: &Self) -> Ordering {
        match self.high.cmp(&other.low) {
            Ordering::Equal => {
                if self.high_included && other.low_included {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            }
            ord => ord,
        }
    }

    /// `self` overlaps `other`: they share at least one point.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.compare_low_high(other) != Ordering::Greater
            && other.compare_low_high(self) != Ordering::Greater
    }

    /// `self` overlaps the single point `p`.
    pub fn overlaps_point(&self, p: &T) -> bool {
        let point = Interval {
            low: p.clone(),
            high: p.clone(),
            low_included: true,
            high_included: true,
        };
        self.overlaps(&point)
    }

    /// Non-strict containment: every point of `other` is a point of `self`.
    pub fn contains(&self, other: &Self) -> bool {
        self.compare_low(other) != Ordering::Greater && other.compare_high(self) != Ordering::Greater
    }

    /// `self` strictly contains `other`: `self.low < other.low` and `other.high < self.high`
    /// under the inclusion-aware endpoint orders.
    pub fn strictly_contains(&self, other: &Self) -> bool {
        self.compare_low(other) == Ordering::Less && other.compare_high(self) == Ordering::Less
    }

    /// The intersection of two overlapping intervals: `[max-low, min-high]`,
    /// each boundary taking the stricter (more restrictive) inclusion.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `self` and `other` do not overlap. Callers
    /// must check [`overlaps`](Self::overlaps) first; this mirrors the
    /// distilled contract's precondition rather than returning a `Result` for
    /// what is a programmer error, not a runtime condition.
    pub fn overlap(&self, other: &Self) -> Self {
        debug_assert!(self.overlaps(other), "overlap() called on non-overlapping intervals");
        let (low, low_included) = if self.compare_low(other) == Ordering::Less {
            (other.low.clone(), other.low_included)
        } else {
            (self.low.clone(), self.low_included)
        };
        let (high, high_included) = if self.compare_high(other) == Ordering::Greater {
            (other.high.clone(), other.high_included)
        } else {
            (self.high.clone(), self.high_included)
        };
        Interval {
            low,
            high,
            low_included,
            high_included,
        }
    }

    /// The convex hull of two intervals (not required to overlap).
    pub fn joined_span(&self, other: &Self) -> Self {
        let (low, low_included) = if self.compare_low(other) == Ordering::Greater {
            (other.low.clone(), other.low_included)
        } else {
            (self.low.clone(), self.low_included)
        };
        let (high, high_included) = if self.compare_high(other) == Ordering::Less {
            (other.high.clone(), other.high_included)
        } else {
            (self.high.clone(), self.high_included)
        };
        Interval {
            low,
            high,
            low_included,
            high_included,
        }
    }
}

impl<T: Ord> Interval<T> {
    pub(crate) fn low_endpoint(&self) -> (&T, bool) {
        (&self.low, self.low_included)
    }

    pub(crate) fn high_endpoint(&self) -> (&T, bool) {
        (&self.high, self.high_included)
    }
}

/// Compares two low endpoints: value, tie-broken so included precedes excluded.
pub(crate) fn cmp_low<T: Ord>(a: &T, a_inc: bool, b: &T, b_inc: bool) -> Ordering {
    match a.cmp(b) {
        Ordering::Equal => b_inc.cmp(&a_inc), // included (true) sorts before excluded (false)
        ord => ord,
    }
}

/// Compares two high endpoints: value, tie-broken so excluded precedes included.
pub(crate) fn cmp_high<T: Ord>(a: &T, a_inc: bool, b: &T, b_inc: bool) -> Ordering {
    match a.cmp(b) {
        Ordering::Equal => a_inc.cmp(&b_inc), // excluded (false) sorts before included (true)
        ord => ord,
    }
}

/// Interval total order: primary key the low endpoint, secondary key the high endpoint.
impl<T: Ord> PartialEq for Interval<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Interval<T> {}

impl<T: Ord> PartialOrd for Interval<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Interval<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        match cmp_low(&self.low, self.low_included, &other.low, other.low_included) {
            Ordering::Equal => cmp_high(&self.high, self.high_included, &other.high, other.high_included),
            ord => ord,
        }
    }
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
    fn rejects_invalid_interval() {
        assert!(Interval::new(5, 3, true, true).is_err());
        assert!(Interval::new(5, 5, true, false).is_err());
        assert!(Interval::new(5, 5, true, true).is_ok());
    }

    #[rstest]
    fn half_open_touching_does_not_overlap() {
        let a = iv(1, 3, true, false);
        let b = iv(3, 5, true, false);
        assert!(!a.overlaps(&b));
    }

    #[rstest]
    fn closed_touching_overlaps_at_shared_point() {
        let a = iv(1, 3, true, true);
        let b = iv(3, 5, true, true);
        assert!(a.overlaps(&b));
    }

    #[rstest]
    fn strict_containment() {
        let outer = iv(1, 10, true, true);
        let inner = iv(2, 9, true, true);
        assert!(outer.strictly_contains(&inner));
        assert!(!inner.strictly_contains(&outer));
    }

    #[rstest]
    fn overlap_picks_stricter_inclusion() {
        let a = iv(1, 5, true, true);
        let b = iv(5, 8, true, true);
        assert!(a.overlaps(&b));
        let ov = a.overlap(&b);
        assert_eq!(ov.low, 5);
        assert_eq!(ov.high, 5);
    }

    #[rstest]
    fn joined_span_is_the_hull() {
        let a = iv(1, 3, true, false);
        let b = iv(10, 12, false, true);
        let span = a.joined_span(&b);
        assert_eq!(span.low, 1);
        assert_eq!(span.high, 12);
        assert!(span.low_included);
        assert!(span.high_included);
    }

    #[rstest]
    fn overlaps_point_respects_exclusion() {
        let a = iv(1, 3, true, false);
        assert!(a.overlaps_point(&1));
        assert!(!a.overlaps_point(&3));
        assert!(a.overlaps_point(&2));
    }
}
