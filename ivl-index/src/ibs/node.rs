use std::collections::HashSet;

use ivl_core::IntervalHandle;

use crate::arena::NodeId;

/// One endpoint key of the IBS-Tree, with the three interval sets attached to
/// it and the per-node aggregates used for O(1) max-depth (§4.2.2).
pub(super) struct IbsNode<T> {
    pub key: T,
    /// Intervals `i` with `i.high < key` on the near side but whose span still
    /// crosses this key from the left (see the distilled set invariants).
    pub less: HashSet<IntervalHandle<T>>,
    /// Intervals with an endpoint exactly at `key`, or that cross it on both sides.
    pub equal: HashSet<IntervalHandle<T>>,
    /// Mirror of `less` on the right.
    pub greater: HashSet<IntervalHandle<T>>,

    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub height: i32,

    pub intervals_ending_in_node: usize,
    pub delta_at: i64,
    pub delta_after: i64,
    pub sum: i64,
    pub max: i64,
}

impl<T> IbsNode<T> {
    pub fn new(key: T) -> Self {
        IbsNode {
            key,
            less: HashSet::new(),
            equal: HashSet::new(),
            greater: HashSet::new(),
            left: None,
            right: None,
            height: 1,
            intervals_ending_in_node: 0,
            delta_at: 0,
            delta_after: 0,
            sum: 0,
            max: 0,
        }
    }
}
