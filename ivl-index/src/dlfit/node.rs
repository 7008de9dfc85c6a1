use ivl_core::IntervalHandle;

use crate::arena::NodeId;

/// A DLFIT node: an AVL tree node keyed by the interval order, additionally
/// threaded into a doubly-linked list in sorted order via `pred`/`succ`.
///
/// There is no synthesizable sentinel value for an arbitrary `T`, so the two
/// conceptual boundary sentinels are modeled as `None` on `pred`/`succ` at the
/// ends of the list rather than as real arena slots.
pub(super) struct DlfitNode<T> {
    pub handle: IntervalHandle<T>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub height: i32,
    pub pred: Option<NodeId>,
    pub succ: Option<NodeId>,
}

impl<T> DlfitNode<T> {
    pub fn new(handle: IntervalHandle<T>) -> Self {
        DlfitNode {
            handle,
            left: None,
            right: None,
            height: 1,
            pred: None,
            succ: None,
        }
    }
}
