use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::interval::Interval;

/// A reference-identity handle to a stored interval.
///
/// Per §9 of the design notes, reference identity for dedup is modeled with a
/// reference-counted handle rather than a raw pointer: `Rc::ptr_eq` gives stable
/// identity for as long as any handle is alive, and single ownership semantics
/// stay unambiguous. Cloning an `IntervalHandle` clones the `Rc`, not the interval;
/// two handles are equal (and hash the same) iff they point at the same allocation,
/// even if the underlying intervals are value-equal ("reference duplicates").
#[derive(Debug, Clone)]
pub struct IntervalHandle<T>(pub Rc<Interval<T>>);

impl<T> IntervalHandle<T> {
    pub fn new(interval: Interval<T>) -> Self {
        IntervalHandle(Rc::new(interval))
    }

    pub fn from_rc(rc: Rc<Interval<T>>) -> Self {
        IntervalHandle(rc)
    }

    pub fn as_interval(&self) -> &Interval<T> {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> PartialEq for IntervalHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for IntervalHandle<T> {}

impl<T> Hash for IntervalHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl<T> std::ops::Deref for IntervalHandle<T> {
    type Target = Interval<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn distinct_handles_to_equal_values_are_not_equal() {
        let a = IntervalHandle::new(Interval::new(1, 5, true, true).unwrap());
        let b = IntervalHandle::new(Interval::new(1, 5, true, true).unwrap());
        assert_ne!(a, b, "reference duplicates must hash/compare distinctly");
        assert_eq!(a, a.clone());
    }
}
