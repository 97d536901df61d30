//! B+ tree node representation.
//!
//! Nodes live by value in the tree's arena and refer to each other through
//! [`NodeId`] indices:
//! - Internal nodes: store one routing key per child, `keys[i]` being the
//!   leading key of `children[i]`
//! - Leaf nodes: store one record per key, doubly-linked for ordered scans
//!
//! Parent and sibling links are plain indices and carry no ownership.

use crate::btree::record::Record;

/// Index of a node within the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

/// Per-slot payload of a node; one entry per key.
#[derive(Debug)]
pub(crate) enum NodeStorage<V> {
    Internal(Vec<NodeId>),
    Leaf(Vec<Record<V>>),
}

/// A fixed-capacity tree node.
///
/// # Invariants
/// - `keys.len()` equals the number of children or records
/// - `keys` is non-decreasing
/// - `keys.len() <= order`; buffers are allocated with capacity `order`
#[derive(Debug)]
pub(crate) struct Node<K, V> {
    /// Unique id, assigned at creation and never reused.
    pub(crate) id: u64,
    pub(crate) keys: Vec<K>,
    pub(crate) storage: NodeStorage<V>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) previous: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    /// Informational tag shown by dumps; set by the consistency checker.
    pub(crate) annotation: &'static str,
}

impl<K: Ord, V> Node<K, V> {
    pub(crate) const fn new(id: u64, keys: Vec<K>, storage: NodeStorage<V>) -> Self {
        Self {
            id,
            keys,
            storage,
            parent: None,
            previous: None,
            next: None,
            annotation: "",
        }
    }

    pub(crate) const fn is_leaf(&self) -> bool {
        matches!(self.storage, NodeStorage::Leaf(_))
    }

    /// Number of occupied slots.
    pub(crate) fn count(&self) -> usize {
        self.keys.len()
    }

    /// Child ids of an internal node; empty for leaves.
    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.storage {
            NodeStorage::Internal(children) => children,
            NodeStorage::Leaf(_) => &[],
        }
    }

    /// Records of a leaf; empty for internal nodes.
    pub(crate) fn records(&self) -> &[Record<V>] {
        match &self.storage {
            NodeStorage::Leaf(records) => records,
            NodeStorage::Internal(_) => &[],
        }
    }

    /// Position of `child` among this node's children.
    pub(crate) fn index_of(&self, child: NodeId) -> Option<usize> {
        self.children().iter().position(|&current| current == child)
    }

    /// Slot a new `key` belongs in: just past every key less than or equal to it.
    ///
    /// Equal keys therefore keep their insertion order.
    // A linear scan beat binary search at every realistic order: the pivot
    // arithmetic and mispredicted branches cost more than the comparisons.
    pub(crate) fn insert_index(&self, key: &K) -> usize {
        let mut index = 0;
        for existing in &self.keys {
            if existing > key {
                break;
            }
            index += 1;
        }
        index
    }

    /// Shift the slots at and after `index` right and place a record there.
    ///
    /// # Pre-conditions
    /// - The node is a leaf with spare capacity
    pub(crate) fn place_record(&mut self, index: usize, key: K, record: Record<V>) {
        let NodeStorage::Leaf(records) = &mut self.storage else {
            unreachable!("records can only be placed in leaf nodes");
        };
        self.keys.insert(index, key);
        records.insert(index, record);
    }

    /// Shift the slots at and after `index` right and place a child there.
    ///
    /// # Pre-conditions
    /// - The node is internal with spare capacity
    pub(crate) fn place_child(&mut self, index: usize, key: K, child: NodeId) {
        let NodeStorage::Internal(children) = &mut self.storage else {
            unreachable!("children can only be placed in internal nodes");
        };
        self.keys.insert(index, key);
        children.insert(index, child);
    }

    /// Move slots `[split_point, count)` to the end of `target`, preserving order.
    ///
    /// # Pre-conditions
    /// - `target` has the same node type and room for the moved slots
    pub(crate) fn move_tail_into(&mut self, split_point: usize, target: &mut Self) {
        target.keys.extend(self.keys.drain(split_point..));
        match (&mut self.storage, &mut target.storage) {
            (NodeStorage::Leaf(source), NodeStorage::Leaf(destination)) => {
                destination.extend(source.drain(split_point..));
            }
            (NodeStorage::Internal(source), NodeStorage::Internal(destination)) => {
                destination.extend(source.drain(split_point..));
            }
            _ => unreachable!("split sibling must match the node type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(keys: &[i32]) -> Node<i32, &'static str> {
        let records = (1..=keys.len() as u64)
            .map(|id| Record::new(id, "v"))
            .collect();
        Node::new(1, keys.to_vec(), NodeStorage::Leaf(records))
    }

    #[test]
    fn test_insert_index_linear() {
        let node = leaf(&[10, 20, 30]);
        assert_eq!(node.insert_index(&5), 0);
        assert_eq!(node.insert_index(&15), 1);
        assert_eq!(node.insert_index(&35), 3);
    }

    #[test]
    fn test_insert_index_lands_after_duplicates() {
        let node = leaf(&[10, 20, 20, 20, 30]);
        assert_eq!(node.insert_index(&20), 4);
        assert_eq!(node.insert_index(&10), 1);
    }

    #[test]
    fn test_place_record_shifts_right() {
        let mut node = leaf(&[10, 30]);
        node.place_record(1, 20, Record::new(9, "new"));

        assert_eq!(node.keys, vec![10, 20, 30]);
        assert_eq!(node.records()[1].record_id, 9);
        assert_eq!(node.records()[2].record_id, 2);
        assert_eq!(node.count(), 3);
    }

    #[test]
    fn test_place_child_and_index_of() {
        let mut node: Node<i32, ()> =
            Node::new(1, vec![10, 30], NodeStorage::Internal(vec![NodeId(4), NodeId(6)]));
        node.place_child(1, 20, NodeId(5));

        assert_eq!(node.children(), &[NodeId(4), NodeId(5), NodeId(6)]);
        assert_eq!(node.index_of(NodeId(5)), Some(1));
        assert_eq!(node.index_of(NodeId(7)), None);
        assert!(!node.is_leaf());
        assert!(node.records().is_empty());
    }

    #[test]
    fn test_move_tail_into_sibling() {
        let mut node = leaf(&[1, 2, 3, 4, 5]);
        let mut sibling = Node::new(2, Vec::new(), NodeStorage::Leaf(Vec::new()));

        node.move_tail_into(2, &mut sibling);

        assert_eq!(node.keys, vec![1, 2]);
        assert_eq!(sibling.keys, vec![3, 4, 5]);
        let moved: Vec<u64> = sibling.records().iter().map(|r| r.record_id).collect();
        assert_eq!(moved, vec![3, 4, 5]);
        assert!(sibling.is_leaf());
    }
}
