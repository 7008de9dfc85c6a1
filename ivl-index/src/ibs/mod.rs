//! The IBS-Tree: a height-balanced interval binary search tree (Hanson &
//! Chaabouni) exposing O(1) maximum-depth via per-node aggregates.
//!
//! Every endpoint value currently stored becomes a node key. Each node keeps
//! three reference-hashed sets (`less`, `equal`, `greater`) holding the
//! intervals that cross or terminate at that key; rotations migrate entries
//! between the three sets so the invariants in the module doc of [`node`]
//! continue to hold after rebalancing.

mod node;

use std::collections::HashSet;
use std::fmt::Debug;

use ivl_core::{IndexError, Interval, IntervalHandle};

use crate::arena::{Arena, NodeId};
use crate::observers::Observers;
use crate::traits::IntervalIndex;
use node::IbsNode;

pub struct IbsTree<T> {
    arena: Arena<IbsNode<T>>,
    root: Option<NodeId>,
    members: HashSet<IntervalHandle<T>>,
    observers: Observers<T>,
}

impl<T> Default for IbsTree<T> {
    fn default() -> Self {
        IbsTree {
            arena: Arena::new(),
            root: None,
            members: HashSet::new(),
            observers: Observers::new(),
        }
    }
}

impl<T: Ord + Clone + Debug> IbsTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observers_mut(&mut self) -> &mut Observers<T> {
        &mut self.observers
    }

    /// Inserts `handle` by reference; returns whether it was newly inserted
    /// (a second `add` of the exact same `Rc` is a no-op returning `false`).
    pub fn add(&mut self, handle: IntervalHandle<T>) -> bool {
        if !self.members.insert(handle.clone()) {
            return false;
        }
        let mut low_node = None;
        self.root = Some(self.insert_low(self.root, None, &handle, &mut low_node, true));
        let mut high_node = None;
        self.root = Some(self.insert_high(self.root, None, &handle, &mut high_node, true));
        debug_assert!(low_node.is_some() && high_node.is_some());
        self.observers.fire_added(&handle.0);
        true
    }

    /// Reference-equal removal. `O(log n)` amortized; may trigger a bounded
    /// re-indexing pass when an endpoint node is excised (see
    /// [`Self::excise_and_redistribute`]).
    pub fn remove(&mut self, handle: &IntervalHandle<T>) -> bool {
        if !self.members.remove(handle) {
            return false;
        }
        let mut low_node = None;
        self.remove_low(self.root, None, handle, &mut low_node);
        let mut high_node = None;
        self.remove_high(self.root, None, handle, &mut high_node);

        let low_id = low_node.expect("remove: low endpoint node must exist for a stored handle");
        let high_id = high_node.expect("remove: high endpoint node must exist for a stored handle");

        if self.arena.get(low_id).intervals_ending_in_node == 0 {
            self.excise_and_redistribute(low_id);
        }
        if low_id != high_id && self.arena.get(high_id).intervals_ending_in_node == 0 {
            self.excise_and_redistribute(high_id);
        }

        self.observers.fire_removed(&handle.0);
        true
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.members.clear();
        self.observers.fire_cleared();
    }

    /// `root.max`, or 0 when empty. O(1).
    pub fn maximum_overlap(&self) -> usize {
        self.root.map(|r| self.arena.get(r).max).unwrap_or(0).max(0) as usize
    }

    pub fn contains(&self, handle: &IntervalHandle<T>) -> bool {
        self.members.contains(handle)
    }

    /// Unstable GraphViz dump of the tree structure, for debugging only.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph ibs_tree {\n");
        if let Some(root) = self.root {
            self.dot_node(root, &mut out);
        }
        out.push_str("}\n");
        out
    }

    fn dot_node(&self, id: NodeId, out: &mut String) {
        let n = self.arena.get(id);
        out.push_str(&format!(
            "  n{:?} [label=\"{:?}\\nless={} equal={} greater={}\"];\n",
            id,
            n.key,
            n.less.len(),
            n.equal.len(),
            n.greater.len()
        ));
        if let Some(l) = n.left {
            out.push_str(&format!("  n{:?} -> n{:?} [label=\"L\"];\n", id, l));
            self.dot_node(l, out);
        }
        if let Some(r) = n.right {
            out.push_str(&format!("  n{:?} -> n{:?} [label=\"R\"];\n", id, r));
            self.dot_node(r, out);
        }
    }

    // ---- low-endpoint descent (insertion) ----

    fn insert_low(
        &mut self,
        node: Option<NodeId>,
        ancestor_r: Option<NodeId>,
        handle: &IntervalHandle<T>,
        out_low_node: &mut Option<NodeId>,
        apply_delta: bool,
    ) -> NodeId {
        match node {
            None => {
                let id = self.arena.insert(IbsNode::new(handle.low.clone()));
                self.apply_low_terminal(id, ancestor_r, handle, apply_delta);
                self.refresh(id);
                *out_low_node = Some(id);
                id
            }
            Some(id) => {
                match handle.low.cmp(&self.arena.get(id).key) {
                    std::cmp::Ordering::Greater => {
                        let child = self.arena.get(id).right;
                        let new_right = self.insert_low(child, ancestor_r, handle, out_low_node, apply_delta);
                        self.arena.get_mut(id).right = Some(new_right);
                    }
                    std::cmp::Ordering::Less => {
                        self.apply_low_passthrough(id, ancestor_r, handle);
                        let child = self.arena.get(id).left;
                        let new_left = self.insert_low(child, Some(id), handle, out_low_node, apply_delta);
                        self.arena.get_mut(id).left = Some(new_left);
                    }
                    std::cmp::Ordering::Equal => {
                        self.apply_low_terminal(id, ancestor_r, handle, apply_delta);
                        *out_low_node = Some(id);
                    }
                }
                self.rebalance(id)
            }
        }
    }

    fn apply_low_terminal(&mut self, id: NodeId, ancestor_r: Option<NodeId>, handle: &IntervalHandle<T>, apply_delta: bool) {
        let r_covers = ancestor_r.map(|r| self.arena.get(r).key <= handle.high).unwrap_or(false);
        let n = self.arena.get_mut(id);
        if r_covers {
            n.greater.insert(handle.clone());
        }
        if handle.low_included {
            n.equal.insert(handle.clone());
        }
        if apply_delta {
            if handle.low_included {
                n.delta_at += 1;
            } else {
                n.delta_after += 1;
            }
            n.intervals_ending_in_node += 1;
        }
    }

    fn apply_low_passthrough(&mut self, id: NodeId, ancestor_r: Option<NodeId>, handle: &IntervalHandle<T>) {
        let r_covers = ancestor_r.map(|r| self.arena.get(r).key <= handle.high).unwrap_or(false);
        let key_lt_high = self.arena.get(id).key < handle.high;
        let n = self.arena.get_mut(id);
        if r_covers {
            n.greater.insert(handle.clone());
        }
        if key_lt_high {
            n.equal.insert(handle.clone());
        }
    }

    // ---- high-endpoint descent (insertion), mirror of the low descent ----

    fn insert_high(
        &mut self,
        node: Option<NodeId>,
        ancestor_l: Option<NodeId>,
        handle: &IntervalHandle<T>,
        out_high_node: &mut Option<NodeId>,
        apply_delta: bool,
    ) -> NodeId {
        match node {
            None => {
                let id = self.arena.insert(IbsNode::new(handle.high.clone()));
                self.apply_high_terminal(id, ancestor_l, handle, apply_delta);
                self.refresh(id);
                *out_high_node = Some(id);
                id
            }
            Some(id) => {
                match handle.high.cmp(&self.arena.get(id).key) {
                    std::cmp::Ordering::Less => {
                        let child = self.arena.get(id).left;
                        let new_left = self.insert_high(child, ancestor_l, handle, out_high_node, apply_delta);
                        self.arena.get_mut(id).left = Some(new_left);
                    }
                    std::cmp::Ordering::Greater => {
                        self.apply_high_passthrough(id, ancestor_l, handle);
                        let child = self.arena.get(id).right;
                        let new_right = self.insert_high(child, Some(id), handle, out_high_node, apply_delta);
                        self.arena.get_mut(id).right = Some(new_right);
                    }
                    std::cmp::Ordering::Equal => {
                        self.apply_high_terminal(id, ancestor_l, handle, apply_delta);
                        *out_high_node = Some(id);
                    }
                }
                self.rebalance(id)
            }
        }
    }

    fn apply_high_terminal(&mut self, id: NodeId, ancestor_l: Option<NodeId>, handle: &IntervalHandle<T>, apply_delta: bool) {
        let l_covers = ancestor_l.map(|l| self.arena.get(l).key >= handle.low).unwrap_or(false);
        let n = self.arena.get_mut(id);
        if l_covers {
            n.less.insert(handle.clone());
        }
        if handle.high_included {
            n.equal.insert(handle.clone());
        }
        if apply_delta {
            if handle.high_included {
                n.delta_after -= 1;
            } else {
                n.delta_at -= 1;
            }
            n.intervals_ending_in_node += 1;
        }
    }

    fn apply_high_passthrough(&mut self, id: NodeId, ancestor_l: Option<NodeId>, handle: &IntervalHandle<T>) {
        let l_covers = ancestor_l.map(|l| self.arena.get(l).key >= handle.low).unwrap_or(false);
        let key_gt_low = self.arena.get(id).key > handle.low;
        let n = self.arena.get_mut(id);
        if l_covers {
            n.less.insert(handle.clone());
        }
        if key_gt_low {
            n.equal.insert(handle.clone());
        }
    }

    /// Re-walks `handle` into the current tree shape, touching only the three
    /// sets (no delta/count change, no node creation: both of `handle`'s own
    /// endpoint nodes are assumed to already exist). Used to restore the set
    /// invariants for intervals that were passing through a node excised by
    /// [`Self::excise_and_redistribute`].
    fn redistribute(&mut self, handle: &IntervalHandle<T>) {
        let mut discard = None;
        self.root = Some(self.insert_low(self.root, None, handle, &mut discard, false));
        let mut discard = None;
        self.root = Some(self.insert_high(self.root, None, handle, &mut discard, false));
    }

    // ---- removal descents, mirroring the insertion descents ----

    fn remove_low(&mut self, node: Option<NodeId>, ancestor_r: Option<NodeId>, handle: &IntervalHandle<T>, out_low_node: &mut Option<NodeId>) {
        let Some(id) = node else {
            panic!("remove_low: handle not found along its own low-descent path");
        };
        match handle.low.cmp(&self.arena.get(id).key) {
            std::cmp::Ordering::Greater => {
                let child = self.arena.get(id).right;
                self.remove_low(child, ancestor_r, handle, out_low_node);
            }
            std::cmp::Ordering::Less => {
                self.unapply_low_passthrough(id, ancestor_r, handle);
                let child = self.arena.get(id).left;
                self.remove_low(child, Some(id), handle, out_low_node);
            }
            std::cmp::Ordering::Equal => {
                self.unapply_low_terminal(id, ancestor_r, handle);
                *out_low_node = Some(id);
            }
        }
        self.refresh(id);
    }

    fn unapply_low_terminal(&mut self, id: NodeId, ancestor_r: Option<NodeId>, handle: &IntervalHandle<T>) {
        let r_covers = ancestor_r.map(|r| self.arena.get(r).key <= handle.high).unwrap_or(false);
        let n = self.arena.get_mut(id);
        if r_covers {
            n.greater.remove(handle);
        }
        if handle.low_included {
            n.equal.remove(handle);
        }
        if handle.low_included {
            n.delta_at -= 1;
        } else {
            n.delta_after -= 1;
        }
        n.intervals_ending_in_node -= 1;
    }

    fn unapply_low_passthrough(&mut self, id: NodeId, ancestor_r: Option<NodeId>, handle: &IntervalHandle<T>) {
        let r_covers = ancestor_r.map(|r| self.arena.get(r).key <= handle.high).unwrap_or(false);
        let key_lt_high = self.arena.get(id).key < handle.high;
        let n = self.arena.get_mut(id);
        if r_covers {
            n.greater.remove(handle);
        }
        if key_lt_high {
            n.equal.remove(handle);
        }
    }

    fn remove_high(&mut self, node: Option<NodeId>, ancestor_l: Option<NodeId>, handle: &IntervalHandle<T>, out_high_node: &mut Option<NodeId>) {
        let Some(id) = node else {
            panic!("remove_high: handle not found along its own high-descent path");
        };
        match handle.high.cmp(&self.arena.get(id).key) {
            std::cmp::Ordering::Less => {
                let child = self.arena.get(id).left;
                self.remove_high(child, ancestor_l, handle, out_high_node);
            }
            std::cmp::Ordering::Greater => {
                self.unapply_high_passthrough(id, ancestor_l, handle);
                let child = self.arena.get(id).right;
                self.remove_high(child, Some(id), handle, out_high_node);
            }
            std::cmp::Ordering::Equal => {
                self.unapply_high_terminal(id, ancestor_l, handle);
                *out_high_node = Some(id);
            }
        }
        self.refresh(id);
    }

    fn unapply_high_terminal(&mut self, id: NodeId, ancestor_l: Option<NodeId>, handle: &IntervalHandle<T>) {
        let l_covers = ancestor_l.map(|l| self.arena.get(l).key >= handle.low).unwrap_or(false);
        let n = self.arena.get_mut(id);
        if l_covers {
            n.less.remove(handle);
        }
        if handle.high_included {
            n.equal.remove(handle);
        }
        if handle.high_included {
            n.delta_after += 1;
        } else {
            n.delta_at += 1;
        }
        n.intervals_ending_in_node -= 1;
    }

    fn unapply_high_passthrough(&mut self, id: NodeId, ancestor_l: Option<NodeId>, handle: &IntervalHandle<T>) {
        let l_covers = ancestor_l.map(|l| self.arena.get(l).key >= handle.low).unwrap_or(false);
        let key_gt_low = self.arena.get(id).key > handle.low;
        let n = self.arena.get_mut(id);
        if l_covers {
            n.less.remove(handle);
        }
        if key_gt_low {
            n.equal.remove(handle);
        }
    }

    /// Physically excises a node whose `intervals_ending_in_node` has reached
    /// zero, then re-indexes (via [`Self::redistribute`]) every other
    /// interval that was merely passing through it.
    fn excise_and_redistribute(&mut self, target: NodeId) {
        let key = self.arena.get(target).key.clone();
        let leftover: Vec<IntervalHandle<T>> = {
            let n = self.arena.get(target);
            n.less.iter().chain(n.equal.iter()).chain(n.greater.iter()).cloned().collect()
        };
        self.root = self.excise(self.root, &key);
        for h in leftover {
            self.redistribute(&h);
        }
    }

    fn excise(&mut self, node: Option<NodeId>, target_key: &T) -> Option<NodeId> {
        let id = node.expect("excise: target key must exist in the tree");
        match target_key.cmp(&self.arena.get(id).key) {
            std::cmp::Ordering::Less => {
                let child = self.arena.get(id).left;
                let new_left = self.excise(child, target_key);
                self.arena.get_mut(id).left = new_left;
                Some(self.rebalance(id))
            }
            std::cmp::Ordering::Greater => {
                let child = self.arena.get(id).right;
                let new_right = self.excise(child, target_key);
                self.arena.get_mut(id).right = new_right;
                Some(self.rebalance(id))
            }
            std::cmp::Ordering::Equal => {
                let left = self.arena.get(id).left;
                let right = self.arena.get(id).right;
                match (left, right) {
                    (None, None) => {
                        self.arena.remove(id);
                        None
                    }
                    (Some(l), None) => {
                        self.arena.remove(id);
                        Some(l)
                    }
                    (None, Some(r)) => {
                        self.arena.remove(id);
                        Some(r)
                    }
                    (Some(_), Some(r)) => {
                        let succ = self.leftmost(r);
                        let new_right = self.excise_min(r);
                        self.arena.get_mut(succ).left = left;
                        self.arena.get_mut(succ).right = new_right;
                        self.arena.remove(id);
                        Some(self.rebalance(succ))
                    }
                }
            }
        }
    }

    fn excise_min(&mut self, node: NodeId) -> Option<NodeId> {
        let left = self.arena.get(node).left;
        match left {
            None => self.arena.get(node).right,
            Some(l) => {
                let new_left = self.excise_min(l);
                self.arena.get_mut(node).left = new_left;
                Some(self.rebalance(node))
            }
        }
    }

    fn leftmost(&self, mut node: NodeId) -> NodeId {
        while let Some(l) = self.arena.get(node).left {
            node = l;
        }
        node
    }

    // ---- AVL bookkeeping ----

    fn height(&self, id: Option<NodeId>) -> i32 {
        id.map(|i| self.arena.get(i).height).unwrap_or(0)
    }

    fn child_sum(&self, id: Option<NodeId>) -> i64 {
        id.map(|i| self.arena.get(i).sum).unwrap_or(0)
    }

    fn child_max(&self, id: Option<NodeId>) -> i64 {
        id.map(|i| self.arena.get(i).max).unwrap_or(0)
    }

    fn recompute_height(&mut self, id: NodeId) {
        let h = 1 + self.height(self.arena.get(id).left).max(self.height(self.arena.get(id).right));
        self.arena.get_mut(id).height = h;
    }

    /// `sum`/`max` per §4.2.2, with missing children treated as `(0, 0)`.
    fn recompute_aggregates(&mut self, id: NodeId) {
        let (left, right, delta_at, delta_after) = {
            let n = self.arena.get(id);
            (n.left, n.right, n.delta_at, n.delta_after)
        };
        let left_sum = self.child_sum(left);
        let right_sum = self.child_sum(right);
        let left_max = self.child_max(left);
        let right_max = self.child_max(right);
        let sum = left_sum + delta_at + delta_after + right_sum;
        let max = left_max
            .max(left_sum + delta_at)
            .max(left_sum + delta_at + delta_after)
            .max(left_sum + delta_at + delta_after + right_max);
        let n = self.arena.get_mut(id);
        n.sum = sum;
        n.max = max;
    }

    fn refresh(&mut self, id: NodeId) {
        self.recompute_height(id);
        self.recompute_aggregates(id);
    }

    fn balance_factor(&self, id: NodeId) -> i32 {
        self.height(self.arena.get(id).right) - self.height(self.arena.get(id).left)
    }

    fn rebalance(&mut self, id: NodeId) -> NodeId {
        self.refresh(id);
        let bf = self.balance_factor(id);
        if bf > 1 {
            let right = self.arena.get(id).right.expect("balance factor > 1 implies a right child");
            if self.balance_factor(right) < 0 {
                let new_right = self.rotate_right(right);
                self.arena.get_mut(id).right = Some(new_right);
            }
            self.rotate_left(id)
        } else if bf < -1 {
            let left = self.arena.get(id).left.expect("balance factor < -1 implies a left child");
            if self.balance_factor(left) > 0 {
                let new_left = self.rotate_left(left);
                self.arena.get_mut(id).left = Some(new_left);
            }
            self.rotate_right(id)
        } else {
            id
        }
    }

    fn rotate_left(&mut self, root: NodeId) -> NodeId {
        let n = self.arena.get(root).right.expect("rotate_left requires a right child");
        self.migrate_sets_left(root, n);
        let n_left = self.arena.get(n).left;
        self.arena.get_mut(root).right = n_left;
        self.arena.get_mut(n).left = Some(root);
        self.refresh(root);
        self.refresh(n);
        n
    }

    fn rotate_right(&mut self, root: NodeId) -> NodeId {
        let n = self.arena.get(root).left.expect("rotate_right requires a left child");
        self.migrate_sets_right(root, n);
        let n_right = self.arena.get(n).right;
        self.arena.get_mut(root).left = n_right;
        self.arena.get_mut(n).right = Some(root);
        self.refresh(root);
        self.refresh(n);
        n
    }

    /// Set migration for a left rotation at `root` (new subtree root `n`),
    /// per §4.2.1: `n` absorbs `root`'s `greater` coverage, the part of `n`'s
    /// `less` set that does not already cover `root` moves down into
    /// `root.greater`, and whatever remains of `n`'s `less` set is dropped
    /// from `root` (it's now implied by `n` sitting above `root`).
    fn migrate_sets_left(&mut self, root: NodeId, n: NodeId) {
        let mut n_greater = std::mem::take(&mut self.arena.get_mut(n).greater);
        let mut n_equal = std::mem::take(&mut self.arena.get_mut(n).equal);
        let mut n_less = std::mem::take(&mut self.arena.get_mut(n).less);
        let mut root_less = std::mem::take(&mut self.arena.get_mut(root).less);
        let mut root_equal = std::mem::take(&mut self.arena.get_mut(root).equal);
        let mut root_greater = std::mem::take(&mut self.arena.get_mut(root).greater);

        for h in root_greater.iter() {
            n_greater.insert(h.clone());
            n_equal.insert(h.clone());
        }
        let between: Vec<IntervalHandle<T>> = n_less.iter().filter(|h| !root_less.contains(*h)).cloned().collect();
        for h in &between {
            root_greater.insert(h.clone());
            n_less.remove(h);
        }
        for h in n_less.iter() {
            root_equal.remove(h);
            root_less.remove(h);
        }

        self.arena.get_mut(n).greater = n_greater;
        self.arena.get_mut(n).equal = n_equal;
        self.arena.get_mut(n).less = n_less;
        self.arena.get_mut(root).less = root_less;
        self.arena.get_mut(root).equal = root_equal;
        self.arena.get_mut(root).greater = root_greater;
    }

    /// Mirror of [`Self::migrate_sets_left`] with `less`/`greater` swapped.
    fn migrate_sets_right(&mut self, root: NodeId, n: NodeId) {
        let mut n_less = std::mem::take(&mut self.arena.get_mut(n).less);
        let mut n_equal = std::mem::take(&mut self.arena.get_mut(n).equal);
        let mut n_greater = std::mem::take(&mut self.arena.get_mut(n).greater);
        let mut root_greater = std::mem::take(&mut self.arena.get_mut(root).greater);
        let mut root_equal = std::mem::take(&mut self.arena.get_mut(root).equal);
        let mut root_less = std::mem::take(&mut self.arena.get_mut(root).less);

        for h in root_less.iter() {
            n_less.insert(h.clone());
            n_equal.insert(h.clone());
        }
        let between: Vec<IntervalHandle<T>> = n_greater.iter().filter(|h| !root_greater.contains(*h)).cloned().collect();
        for h in &between {
            root_less.insert(h.clone());
            n_greater.remove(h);
        }
        for h in n_greater.iter() {
            root_equal.remove(h);
            root_greater.remove(h);
        }

        self.arena.get_mut(n).less = n_less;
        self.arena.get_mut(n).equal = n_equal;
        self.arena.get_mut(n).greater = n_greater;
        self.arena.get_mut(root).greater = root_greater;
        self.arena.get_mut(root).equal = root_equal;
        self.arena.get_mut(root).less = root_less;
    }

    // ---- queries ----

    fn find_overlaps_at_vec(&self, p: &T) -> Vec<IntervalHandle<T>> {
        let mut out = Vec::new();
        let mut node = self.root;
        while let Some(id) = node {
            let n = self.arena.get(id);
            match p.cmp(&n.key) {
                std::cmp::Ordering::Less => {
                    out.extend(n.less.iter().filter(|h| h.overlaps_point(p)).cloned());
                    node = n.left;
                }
                std::cmp::Ordering::Greater => {
                    out.extend(n.greater.iter().filter(|h| h.overlaps_point(p)).cloned());
                    node = n.right;
                }
                std::cmp::Ordering::Equal => {
                    out.extend(n.equal.iter().cloned());
                    node = None;
                }
            }
        }
        out
    }

    /// Conservative (non-pruning) recursion over every node, checking all
    /// three sets for overlap against `query` and deduplicating by reference.
    /// A tighter split-node descent (pruning subtrees the IBS invariants rule
    /// out) is possible but was judged too easy to get subtly wrong without a
    /// compiler in the loop; this trades the O(log n + k) bound for certainty.
    fn collect_overlaps(&self, node: Option<NodeId>, query: &Interval<T>, seen: &mut HashSet<IntervalHandle<T>>, out: &mut Vec<IntervalHandle<T>>) {
        let Some(id) = node else { return };
        let n = self.arena.get(id);
        for h in n.less.iter().chain(n.equal.iter()).chain(n.greater.iter()) {
            if h.overlaps(query) && seen.insert(h.clone()) {
                out.push(h.clone());
            }
        }
        self.collect_overlaps(n.left, query, seen, out);
        self.collect_overlaps(n.right, query, seen, out);
    }
}

impl<T: Ord + Clone + Debug> IntervalIndex<T> for IbsTree<T> {
    fn find_overlaps_at<'a>(&'a self, p: &T) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        Box::new(self.find_overlaps_at_vec(p).into_iter())
    }

    fn find_overlaps<'a>(&'a self, query: &Interval<T>) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_overlaps(self.root, query, &mut seen, &mut out);
        Box::new(out.into_iter())
    }

    fn span(&self) -> Result<Interval<T>, IndexError> {
        let xs: Vec<Interval<T>> = self.members.iter().map(|h| h.as_interval().clone()).collect();
        ivl_core::algebra::span(&xs)
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = IntervalHandle<T>> + 'a> {
        Box::new(self.members.iter().cloned())
    }

    fn len(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn iv(low: i32, high: i32) -> IntervalHandle<i32> {
        IntervalHandle::new(Interval::new(low, high, true, true).unwrap())
    }

    #[fixture]
    fn scenario_s1() -> (IbsTree<i32>, Vec<IntervalHandle<i32>>) {
        let mut tree = IbsTree::new();
        let handles = vec![iv(1, 5), iv(2, 3), iv(4, 7), iv(6, 8)];
        for h in &handles {
            tree.add(h.clone());
        }
        (tree, handles)
    }

    #[rstest]
    fn s1_point_query_and_max_overlap(scenario_s1: (IbsTree<i32>, Vec<IntervalHandle<i32>>)) {
        let (tree, handles) = scenario_s1;
        let mut hits: Vec<(i32, i32)> = tree
            .find_overlaps_at(&4)
            .map(|h| (h.low, h.high))
            .collect();
        hits.sort();
        assert_eq!(hits, vec![(1, 5), (4, 7)]);
        assert_eq!(tree.maximum_overlap(), 2);
        let _ = handles;
    }

    #[rstest]
    fn s1_remove_keeps_max_overlap_and_query_stable(scenario_s1: (IbsTree<i32>, Vec<IntervalHandle<i32>>)) {
        let (mut tree, handles) = scenario_s1;
        assert!(tree.remove(&handles[1])); // [2,3]
        assert_eq!(tree.maximum_overlap(), 2);
        let mut hits: Vec<(i32, i32)> = tree
            .find_overlaps_at(&4)
            .map(|h| (h.low, h.high))
            .collect();
        hits.sort();
        assert_eq!(hits, vec![(1, 5), (4, 7)]);
    }

    #[rstest]
    fn add_rejects_exact_reference_duplicate() {
        let mut tree = IbsTree::new();
        let a = iv(1, 5);
        assert!(tree.add(a.clone()));
        assert!(!tree.add(a.clone()));
        assert_eq!(tree.len(), 1);
    }

    #[rstest]
    fn reference_duplicates_with_equal_values_both_stored() {
        let mut tree = IbsTree::new();
        let a = iv(1, 5);
        let b = iv(1, 5);
        assert!(tree.add(a));
        assert!(tree.add(b));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.find_overlaps_at(&3).count(), 2);
    }

    #[rstest]
    fn span_and_count_overlaps() {
        let mut tree = IbsTree::new();
        for h in [iv(1, 5), iv(10, 12)] {
            tree.add(h);
        }
        let span = tree.span().unwrap();
        assert_eq!((span.low, span.high), (1, 12));
        let q = Interval::new(0, 20, true, true).unwrap();
        assert_eq!(tree.count_overlaps(&q), 2);
    }

    #[rstest]
    fn remove_of_absent_handle_is_a_no_op() {
        let mut tree = IbsTree::new();
        let a = iv(1, 5);
        tree.add(a.clone());
        let b = iv(1, 5);
        assert!(!tree.remove(&b));
        assert_eq!(tree.len(), 1);
        assert!(tree.remove(&a));
        assert_eq!(tree.len(), 0);
    }

    #[rstest]
    fn many_insertions_stay_balanced_and_queryable() {
        let mut tree = IbsTree::new();
        let mut handles = Vec::new();
        for i in 0..200i32 {
            let h = iv(i, i + 2);
            tree.add(h.clone());
            handles.push(h);
        }
        assert_eq!(tree.len(), 200);
        assert!(tree.find_overlaps_at(&0).count() >= 1);
        for h in &handles {
            assert!(tree.remove(h));
        }
        assert!(tree.is_empty());
        assert_eq!(tree.maximum_overlap(), 0);
    }

    #[rstest]
    fn fresh_leaf_aggregates_propagate_to_an_ancestor_never_descended_again() {
        let mut tree = IbsTree::new();
        tree.add(iv(10, 20));
        tree.add(iv(20, 30));
        tree.add(iv(15, 30));
        assert_eq!(tree.maximum_overlap(), 3);
        assert_eq!(tree.count_overlaps(&Interval::new(20, 20, true, true).unwrap()), 3);
    }

    #[rstest]
    fn clear_empties_the_tree() {
        let mut tree = IbsTree::new();
        tree.add(iv(1, 2));
        tree.add(iv(3, 4));
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.maximum_overlap(), 0);
    }
}
