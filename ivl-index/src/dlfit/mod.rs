//! Doubly-Linked Finite Interval Tree: an AVL tree over **non-overlapping**
//! intervals, threaded into a sorted doubly-linked list so traversal and
//! range queries don't need to revisit tree structure once the first node is
//! located. `add` is the insert-if-no-overlap primitive.

mod node;

use std::fmt::Debug;

use ivl_core::{algebra, IndexError, Interval, IntervalHandle};

use crate::arena::{Arena, NodeId};
use crate::observers::Observers;
use crate::traits::IntervalIndex;
use node::DlfitNode;

pub struct Dlfit<T> {
    arena: Arena<DlfitNode<T>>,
    root: Option<NodeId>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
    observers: Observers<T>,
}

impl<T> Default for Dlfit<T> {
    fn default() -> Self {
        Dlfit {
            arena: Arena::new(),
            root: None,
            head: None,
            tail: None,
            len: 0,
            observers: Observers::new(),
        }
    }
}

impl<T: Ord + Clone + Debug> Dlfit<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observers_mut(&mut self) -> &mut Observers<T> {
        &mut self.observers
    }

    fn height(&self, id: Option<NodeId>) -> i32 {
        id.map_or(0, |id| self.arena.get(id).height)
    }

    fn balance_factor(&self, id: NodeId) -> i32 {
        let node = self.arena.get(id);
        self.height(node.right) - self.height(node.left)
    }

    fn refresh_height(&mut self, id: NodeId) {
        let node = self.arena.get(id);
        let h = 1 + self.height(node.left).max(self.height(node.right));
        self.arena.get_mut(id).height = h;
    }

    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let right = self.arena.get(id).right.expect("rotate_left needs a right child");
        let right_left = self.arena.get(right).left;

        self.arena.get_mut(id).right = right_left;
        self.arena.get_mut(right).left = Some(id);

        self.refresh_height(id);
        self.refresh_height(right);
        right
    }

    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let left = self.arena.get(id).left.expect("rotate_right needs a left child");
        let left_right = self.arena.get(left).right;

        self.arena.get_mut(id).left = left_right;
        self.arena.get_mut(left).right = Some(id);

        self.refresh_height(id);
        self.refresh_height(left);
        left
    }

    fn rebalance(&mut self, id: NodeId) -> NodeId {
        self.refresh_height(id);
        let bf = self.balance_factor(id);

        if bf > 1 {
            let right = self.arena.get(id).right.unwrap();
            if self.balance_factor(right) < 0 {
                let new_right = self.rotate_right(right);
                self.arena.get_mut(id).right = Some(new_right);
            }
            return self.rotate_left(id);
        }
        if bf < -1 {
            let left = self.arena.get(id).left.unwrap();
            if self.balance_factor(left) > 0 {
                let new_left = self.rotate_left(left);
                self.arena.get_mut(id).left = Some(new_left);
            }
            return self.rotate_right(id);
        }
        id
    }

    /// Returns `(pred, succ)`: the list neighbors `key` would sit between if
    /// inserted, found by a single BST descent (no linked-list walk needed).
    fn locate_neighbors(&self, key: &Interval<T>) -> (Option<NodeId>, Option<NodeId>) {
        let mut cur = self.root;
        let mut pred = None;
        let mut succ = None;
        while let Some(id) = cur {
            let node = self.arena.get(id);
            match key.cmp(node.handle.as_interval()) {
                std::cmp::Ordering::Greater => {
                    pred = Some(id);
                    cur = node.right;
                }
                _ => {
                    succ = Some(id);
                    cur = node.left;
                }
            }
        }
        (pred, succ)
    }

    /// Inserts `handle` into the subtree rooted at `node`, returning
    /// `(new_subtree_root, id_of_the_new_node)`. The new node's own id is
    /// threaded back up through the recursion untouched by any rotation a
    /// rebalance along the way performs, so callers can locate it afterwards
    /// to splice it into the linked list.
    fn insert_node(&mut self, node: Option<NodeId>, handle: IntervalHandle<T>) -> (NodeId, NodeId) {
        let Some(id) = node else {
            self.len += 1;
            let new_id = self.arena.insert(DlfitNode::new(handle));
            return (new_id, new_id);
        };
        let key = self.arena.get(id).handle.as_interval().clone();
        let new_id = match handle.as_interval().cmp(&key) {
            std::cmp::Ordering::Less | std::cmp::Ordering::Equal => {
                let left = self.arena.get(id).left;
                let (new_left, new_id) = self.insert_node(left, handle);
                self.arena.get_mut(id).left = Some(new_left);
                new_id
            }
            std::cmp::Ordering::Greater => {
                let right = self.arena.get(id).right;
                let (new_right, new_id) = self.insert_node(right, handle);
                self.arena.get_mut(id).right = Some(new_right);
                new_id
            }
        };
        (self.rebalance(id), new_id)
    }

    /// Inserts `handle` iff it overlaps nothing already stored. Returns
    /// `false` (a no-op) on overlap, matching the "insert-if-no-overlap"
    /// scheduler primitive this structure exists for.
    pub fn add(&mut self, handle: IntervalHandle<T>) -> bool {
        let (pred, succ) = self.locate_neighbors(handle.as_interval());
        if let Some(p) = pred {
            if self.arena.get(p).handle.as_interval().overlaps(handle.as_interval()) {
                return false;
            }
        }
        if let Some(s) = succ {
            if self.arena.get(s).handle.as_interval().overlaps(handle.as_interval()) {
                return false;
            }
        }

        let rc = handle.0.clone();
        let (new_root, new_id) = self.insert_node(self.root, handle);
        self.root = Some(new_root);
        self.splice_in(new_id, pred, succ);

        self.observers.fire_added(&rc);
        true
    }

    fn splice_in(&mut self, new_id: NodeId, pred: Option<NodeId>, succ: Option<NodeId>) {
        self.arena.get_mut(new_id).pred = pred;
        self.arena.get_mut(new_id).succ = succ;
        match pred {
            Some(p) => self.arena.get_mut(p).succ = Some(new_id),
            None => self.head = Some(new_id),
        }
        match succ {
            Some(s) => self.arena.get_mut(s).pred = Some(new_id),
            None => self.tail = Some(new_id),
        }
    }

    /// Finds the arena slot holding a value-equal node, by descent.
    fn find_id(&self, key: &Interval<T>) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = self.arena.get(id);
            match key.cmp(node.handle.as_interval()) {
                std::cmp::Ordering::Equal => return Some(id),
                std::cmp::Ordering::Less => cur = node.left,
                std::cmp::Ordering::Greater => cur = node.right,
            }
        }
        None
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.arena.get(id).left {
            id = l;
        }
        id
    }

    /// Removes `target` from the subtree rooted at `node`, returning the new
    /// subtree root. Two-child case splices the in-order successor's
    /// `NodeId` into `target`'s structural position rather than copying
    /// handles, so `target`'s own slot is always the one freed.
    fn delete(&mut self, node: Option<NodeId>, target: NodeId) -> Option<NodeId> {
        let id = node?;
        if id == target {
            let (left, right) = {
                let n = self.arena.get(id);
                (n.left, n.right)
            };
            return match (left, right) {
                (None, None) => {
                    self.arena.remove(id);
                    None
                }
                (Some(only), None) | (None, Some(only)) => {
                    self.arena.remove(id);
                    Some(only)
                }
                (Some(l), Some(r)) => {
                    let succ = self.leftmost(r);
                    let new_right = self.delete_min(r, succ);
                    self.arena.get_mut(succ).left = Some(l);
                    self.arena.get_mut(succ).right = new_right;
                    self.arena.remove(id);
                    Some(self.rebalance(succ))
                }
            };
        }
        let key = self.arena.get(target).handle.as_interval().clone();
        let node_key = self.arena.get(id).handle.as_interval().clone();
        match key.cmp(&node_key) {
            std::cmp::Ordering::Less => {
                let left = self.arena.get(id).left;
                let new_left = self.delete(left, target);
                self.arena.get_mut(id).left = new_left;
            }
            _ => {
                let right = self.arena.get(id).right;
                let new_right = self.delete(right, target);
                self.arena.get_mut(id).right = new_right;
            }
        }
        Some(self.rebalance(id))
    }

    /// Removes the leftmost node of the subtree rooted at `node` (which must
    /// be `target`'s in-order successor), returning the new subtree root.
    fn delete_min(&mut self, node: NodeId, target: NodeId) -> Option<NodeId> {
        if node == target {
            return self.arena.get(node).right;
        }
        let left = self.arena.get(node).left.expect("target is the leftmost descendant");
        let new_left = self.delete_min(left, target);
        self.arena.get_mut(node).left = new_left;
        Some(self.rebalance(node))
    }

    /// Removes `handle` by value. Returns `false` if nothing matching is stored.
    pub fn remove(&mut self, handle: &IntervalHandle<T>) -> bool {
        let Some(id) = self.find_id(handle.as_interval()) else {
            return false;
        };
        let (pred, succ) = {
            let n = self.arena.get(id);
            (n.pred, n.succ)
        };
        match pred {
            Some(p) => self.arena.get_mut(p).succ = succ,
            None => self.head = succ,
        }
        match succ {
            Some(s) => self.arena.get_mut(s).pred = pred,
            None => self.tail = pred,
        }

        let rc = handle.0.clone();
        self.root = self.delete(self.root, id);
        self.len -= 1;
        self.observers.fire_removed(&rc);
        true
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.observers.fire_cleared();
    }

    pub fn contains(&self, handle: &IntervalHandle<T>) -> bool {
        self.find_id(handle.as_interval())
            .is_some_and(|id| self.arena.get(id).handle.ptr_eq(handle))
    }

    /// Unstable GraphViz dump of the tree structure, for debugging only.
    /// Dashed edges trace the threaded list alongside the tree's solid
    /// left/right edges.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph dlfit {\n");
        if let Some(root) = self.root {
            self.dot_node(root, &mut out);
        }
        out.push_str("}\n");
        out
    }

    fn dot_node(&self, id: NodeId, out: &mut String) {
        let n = self.arena.get(id);
        out.push_str(&format!("  n{:?} [label=\"{:?}\"];\n", id, n.handle.as_interval()));
        if let Some(l) = n.left {
            out.push_str(&format!("  n{:?} -> n{:?} [label=\"L\"];\n", id, l));
            self.dot_node(l, out);
        }
        if let Some(r) = n.right {
            out.push_str(&format!("  n{:?} -> n{:?} [label=\"R\"];\n", id, r));
            self.dot_node(r, out);
        }
        if let Some(s) = n.succ {
            out.push_str(&format!("  n{:?} -> n{:?} [style=dashed, label=\"succ\"];\n", id, s));
        }
    }

    fn locate_floor(&self, p: &T) -> Option<NodeId> {
        let mut cur = self.root?;
        loop {
            let node = self.arena.get(cur);
            let go_left = p.cmp(&node.handle.low) == std::cmp::Ordering::Less;
            let next = if go_left { node.left } else { node.right };
            match next {
                Some(n) => cur = n,
                None => return Some(cur),
            }
        }
    }

    /// Point query: descend comparing `p` to each node's low; the floor node
    /// reached is tested directly, or (if `p` lands before it) its list
    /// predecessor is tested instead, matching a single overlap-or-none result
    /// since stored intervals never overlap.
    pub fn find_overlap_at(&self, p: &T) -> Option<IntervalHandle<T>> {
        let landing = self.locate_floor(p)?;
        let node = self.arena.get(landing);
        let test_self = match p.cmp(&node.handle.low) {
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => node.handle.low_included,
            std::cmp::Ordering::Greater => true,
        };
        if test_self && node.handle.as_interval().overlaps_point(p) {
            return Some(node.handle.clone());
        }
        let pred = node.pred?;
        let pnode = self.arena.get(pred);
        if pnode.handle.as_interval().overlaps_point(p) {
            Some(pnode.handle.clone())
        } else {
            None
        }
    }

    fn locate_first_overlap(&self, query: &Interval<T>) -> Option<NodeId> {
        let mut cur = self.root;
        let mut candidate = None;
        while let Some(id) = cur {
            let node = self.arena.get(id);
            if node.handle.as_interval().compare_high_low(query) == std::cmp::Ordering::Less {
                cur = node.right;
            } else {
                candidate = Some(id);
                cur = node.left;
            }
        }
        candidate
    }

    fn collect_overlaps(&self, query: &Interval<T>) -> Vec<IntervalHandle<T>> {
        let mut out = Vec::new();
        let mut cur = self.locate_first_overlap(query);
        while let Some(id) = cur {
            let node = self.arena.get(id);
            if node.handle.as_interval().compare_low_high(query) == std::cmp::Ordering::Greater {
                break;
            }
            out.push(node.handle.clone());
            cur = node.succ;
        }
        out
    }

    /// Forward sorted-order iterator over every stored interval.
    pub fn iter_sorted<'a>(&'a self) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        Box::new(ForwardIter { dlfit: self, cur: self.head })
    }

    /// Reverse sorted-order iterator over every stored interval.
    pub fn iter_rev<'a>(&'a self) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        Box::new(ReverseIter { dlfit: self, cur: self.tail })
    }

    /// The uncovered gaps between stored intervals (optionally clipped to `span`).
    pub fn gaps(&self) -> Vec<Interval<T>> {
        let xs: Vec<Interval<T>> = self.iter_sorted().map(|h| h.as_interval().clone()).collect();
        algebra::gaps(&xs, None)
    }

    /// Gaps within `query`, including a leading/trailing gap at `query`'s own
    /// boundary where nothing is stored.
    pub fn find_gaps(&self, query: &Interval<T>) -> Vec<Interval<T>> {
        let xs: Vec<Interval<T>> = self.collect_overlaps(query).iter().map(|h| h.as_interval().clone()).collect();
        algebra::gaps(&xs, Some(query))
    }
}

struct ForwardIter<'a, T> {
    dlfit: &'a Dlfit<T>,
    cur: Option<NodeId>,
}

impl<'a, T> Iterator for ForwardIter<'a, T> {
    type Item = IntervalHandle<T>;
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let node = self.dlfit.arena.get(id);
        self.cur = node.succ;
        Some(node.handle.clone())
    }
}

struct ReverseIter<'a, T> {
    dlfit: &'a Dlfit<T>,
    cur: Option<NodeId>,
}

impl<'a, T> Iterator for ReverseIter<'a, T> {
    type Item = IntervalHandle<T>;
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let node = self.dlfit.arena.get(id);
        self.cur = node.pred;
        Some(node.handle.clone())
    }
}

impl<T: Ord + Clone + Debug> IntervalIndex<T> for Dlfit<T> {
    fn find_overlaps_at<'a>(&'a self, p: &T) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        Box::new(self.find_overlap_at(p).into_iter())
    }

    fn find_overlaps<'a>(&'a self, query: &Interval<T>) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        Box::new(self.collect_overlaps(query).into_iter())
    }

    fn span(&self) -> Result<Interval<T>, IndexError> {
        let xs: Vec<Interval<T>> = self.iter_sorted().map(|h| h.as_interval().clone()).collect();
        algebra::span(&xs)
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        self.iter_sorted()
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn ivi(low: i32, high: i32, hi_incl: bool) -> IntervalHandle<i32> {
        IntervalHandle::new(Interval::new(low, high, true, hi_incl).unwrap())
    }

    #[rstest]
    fn s4_half_open_scheduler_sequence() {
        let mut d: Dlfit<i32> = Dlfit::new();
        assert!(d.add(ivi(1, 3, false)));
        assert!(!d.add(ivi(2, 4, false)));
        assert!(d.add(ivi(3, 5, false)));

        let q = Interval::new(2, 3, false, true).unwrap(); // (2, 3], an integer stand-in for a fractional probe window
        let hits: Vec<(i32, i32)> = d.find_overlaps(&q).map(|h| (h.low, h.high)).collect();
        assert_eq!(hits, vec![(1, 3), (3, 5)]);

        let rev: Vec<(i32, i32)> = d.iter_rev().map(|h| (h.low, h.high)).collect();
        assert_eq!(rev, vec![(3, 5), (1, 3)]);
    }

    #[rstest]
    fn gaps_between_disjoint_runs() {
        let mut d: Dlfit<i32> = Dlfit::new();
        d.add(ivi(1, 3, false));
        d.add(ivi(5, 7, false));
        let g = d.gaps();
        assert_eq!(g.len(), 1);
        assert_eq!((g[0].low, g[0].high), (3, 5));
    }

    #[rstest]
    fn add_rejects_overlap_and_leaves_tree_unchanged() {
        let mut d: Dlfit<i32> = Dlfit::new();
        d.add(ivi(10, 20, true));
        assert_eq!(d.len(), 1);
        assert!(!d.add(ivi(15, 25, true)));
        assert_eq!(d.len(), 1);
    }

    #[rstest]
    fn remove_then_readd_preserves_list_order() {
        let mut d: Dlfit<i32> = Dlfit::new();
        let a = ivi(1, 2, true);
        let b = ivi(3, 4, true);
        let c = ivi(5, 6, true);
        d.add(a.clone());
        d.add(b.clone());
        d.add(c.clone());
        assert!(d.remove(&b));
        assert_eq!(d.len(), 2);
        let order: Vec<(i32, i32)> = d.iter().map(|h| (h.low, h.high)).collect();
        assert_eq!(order, vec![(1, 2), (5, 6)]);
        assert!(d.add(ivi(3, 4, true)));
        let order2: Vec<(i32, i32)> = d.iter().map(|h| (h.low, h.high)).collect();
        assert_eq!(order2, vec![(1, 2), (3, 4), (5, 6)]);
    }

    #[rstest]
    fn point_query_respects_half_open_boundary() {
        let mut d: Dlfit<i32> = Dlfit::new();
        d.add(ivi(1, 3, false));
        assert!(d.find_overlap_at(&1).is_some());
        assert!(d.find_overlap_at(&2).is_some());
        assert!(d.find_overlap_at(&3).is_none());
    }

    #[rstest]
    fn many_insertions_and_removals_stay_consistent(#[values(20, 50)] n: i32) {
        let mut d: Dlfit<i32> = Dlfit::new();
        for i in 0..n {
            assert!(d.add(ivi(i * 3, i * 3 + 2, true)));
        }
        assert_eq!(d.len(), n as usize);
        let sorted: Vec<(i32, i32)> = d.iter().map(|h| (h.low, h.high)).collect();
        let mut expect: Vec<(i32, i32)> = (0..n).map(|i| (i * 3, i * 3 + 2)).collect();
        expect.sort();
        assert_eq!(sorted, expect);

        let mut removed = 0;
        for i in (0..n).step_by(2) {
            let h = ivi(i * 3, i * 3 + 2, true);
            assert!(d.remove(&h), "remove matches by value, not identity");
            removed += 1;
        }
        assert_eq!(d.len(), (n as usize) - removed);

        let remaining: Vec<(i32, i32)> = d.iter().map(|h| (h.low, h.high)).collect();
        let expect_remaining: Vec<(i32, i32)> = (0..n).filter(|i| i % 2 != 0).map(|i| (i * 3, i * 3 + 2)).collect();
        assert_eq!(remaining, expect_remaining);
    }
}
