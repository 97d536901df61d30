//! Ordered full scan over a tree.

use std::iter::FusedIterator;
use std::sync::RwLockReadGuard;

use crate::btree::node::NodeId;
use crate::btree::tree::TreeState;

/// Ascending iterator over every `(key, value)` pair of a tree.
///
/// Holds the tree's shared lock from creation until it is dropped, whether
/// it was exhausted or abandoned part way. Each call to
/// [`BPlusTree::scan`](crate::btree::BPlusTree::scan) starts a fresh
/// traversal from the leftmost leaf.
pub struct Scan<'a, K, V> {
    state: RwLockReadGuard<'a, TreeState<K, V>>,
    /// Leaf being emitted; `None` once the rightmost leaf is done.
    leaf: Option<NodeId>,
    slot: usize,
}

impl<'a, K: Ord + Clone, V> Scan<'a, K, V> {
    pub(crate) fn new(state: RwLockReadGuard<'a, TreeState<K, V>>) -> Self {
        let leaf = state.leftmost_leaf();
        Self {
            state,
            leaf,
            slot: 0,
        }
    }
}

impl<K: Ord + Clone, V: Clone> Iterator for Scan<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.state.node(self.leaf?);
            if let Some(record) = node.records().get(self.slot) {
                let pair = (node.keys[self.slot].clone(), record.value.clone());
                self.slot += 1;
                return Some(pair);
            }

            self.leaf = node.next;
            self.slot = 0;
        }
    }
}

impl<K: Ord + Clone, V: Clone> FusedIterator for Scan<'_, K, V> {}
