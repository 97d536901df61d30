//! B+ tree index.
//!
//! An in-memory, ordered key-value index where:
//! - Keys: any totally ordered type, duplicates permitted
//! - Values: stored in [`Record`]s under a per-tree monotonic [`RecordId`]
//!
//! Nodes are held by value in an arena and addressed by index, so the
//! parent and sibling back-references never own anything. All structural
//! state sits behind one reader-writer lock: inserts (splits included) run
//! under the exclusive lock, scans hold the shared lock for their lifetime.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::btree::alloc::NodeAllocator;
use crate::btree::node::{Node, NodeId, NodeStorage};
use crate::btree::record::{Record, RecordId};
use crate::btree::scan::Scan;
use crate::config::{ConfigError, TreeConfig};

/// A B+ tree guarded by a single reader-writer lock.
pub struct BPlusTree<K, V> {
    config: TreeConfig,
    pub(crate) state: RwLock<TreeState<K, V>>,
}

/// Point-in-time counters describing a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub order: usize,
    /// Nodes created so far; also the last assigned node id.
    pub node_count: u64,
    /// Records inserted so far; also the last assigned record id.
    pub record_count: RecordId,
    /// Levels from root to leaves, 0 for an empty tree.
    pub height: usize,
    /// Batch refills performed by the buffer pools.
    pub pool_refills: u64,
}

/// Everything the lock protects.
#[derive(Debug)]
pub(crate) struct TreeState<K, V> {
    pub(crate) order: usize,
    /// Arena of all nodes; a node's index never changes.
    pub(crate) nodes: Vec<Node<K, V>>,
    pub(crate) root: Option<NodeId>,
    pub(crate) node_count: u64,
    pub(crate) record_count: RecordId,
    allocator: NodeAllocator<K, V>,
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Create an empty tree.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OrderTooLow`] if `order < 2`. No tree is built
    /// on error.
    pub fn new(order: usize, preallocation_size: usize) -> Result<Self, ConfigError> {
        Ok(Self::with_config(TreeConfig::new(order, preallocation_size)?))
    }

    /// Create an empty tree from a validated configuration.
    #[must_use]
    pub fn with_config(config: TreeConfig) -> Self {
        tracing::debug!(
            order = config.order(),
            preallocation_size = config.preallocation_size(),
            "creating tree"
        );
        Self {
            config,
            state: RwLock::new(TreeState {
                order: config.order(),
                nodes: Vec::new(),
                root: None,
                node_count: 0,
                record_count: 0,
                allocator: NodeAllocator::new(config),
            }),
        }
    }

    /// The configuration the tree was built with.
    #[must_use]
    pub const fn config(&self) -> TreeConfig {
        self.config
    }

    /// Insert a key-value pair, returning the new record's id.
    ///
    /// Duplicate keys are stored as additional records placed after every
    /// existing equal key.
    pub fn insert(&self, key: K, value: V) -> RecordId {
        self.write_state().insert(key, value)
    }

    /// Lazily iterate all pairs in ascending key order.
    ///
    /// The shared lock is held until the returned [`Scan`] is dropped, so
    /// writers wait for every live scan.
    pub fn scan(&self) -> Scan<'_, K, V> {
        Scan::new(self.read_state())
    }

    /// Number of stored records, counted by a full scan.
    #[must_use]
    pub fn count(&self) -> usize
    where
        V: Clone,
    {
        self.scan().count()
    }

    /// Snapshot of the tree's counters.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let state = self.read_state();
        TreeStats {
            order: state.order,
            node_count: state.node_count,
            record_count: state.record_count,
            height: state.height(),
            pool_refills: state.allocator.refills(),
        }
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, TreeState<K, V>> {
        // Inserts cannot fail, so a poisoned lock is taken over rather than reported.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, TreeState<K, V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Ord + Clone, V> TreeState<K, V> {
    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.0]
    }

    /// Mutable access to two distinct nodes at once.
    fn pair_mut(&mut self, first: NodeId, second: NodeId) -> (&mut Node<K, V>, &mut Node<K, V>) {
        assert_ne!(first, second, "pair_mut needs two distinct nodes");
        if first.0 < second.0 {
            let (low, high) = self.nodes.split_at_mut(second.0);
            (&mut low[first.0], &mut high[0])
        } else {
            let (low, high) = self.nodes.split_at_mut(first.0);
            (&mut high[0], &mut low[second.0])
        }
    }

    fn create_node(&mut self, leaf: bool) -> NodeId {
        self.node_count += 1;
        self.allocator.allocate(&mut self.nodes, self.node_count, leaf)
    }

    /// Levels from root to leaves.
    pub(crate) fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(id) = current {
            height += 1;
            current = self.node(id).children().first().copied();
        }
        height
    }

    /// Leftmost leaf, reached by following `children[0]` from the root.
    pub(crate) fn leftmost_leaf(&self) -> Option<NodeId> {
        let mut current = self.root?;
        while let Some(&first) = self.node(current).children().first() {
            current = first;
        }
        Some(current)
    }

    fn insert(&mut self, key: K, value: V) -> RecordId {
        self.record_count += 1;
        let record_id = self.record_count;
        let record = Record::new(record_id, value);

        let Some(root) = self.root else {
            let leaf = self.create_node(true);
            self.insert_record(leaf, key, record);
            self.root = Some(leaf);
            return record_id;
        };

        let mut target = self.find_leaf(root, &key);
        if self.node(target).count() == self.order {
            target = self.split(target, &key);
        }
        self.insert_record(target, key, record);

        record_id
    }

    /// Descend from `root` to the leaf that should receive `key`.
    ///
    /// At each internal node this picks the last child whose leading key is
    /// less than or equal to `key`, or the first child if there is none.
    // Linear for the same reason as `Node::insert_index`.
    pub(crate) fn find_leaf(&self, root: NodeId, key: &K) -> NodeId {
        let mut current = root;
        loop {
            let node = self.node(current);
            let NodeStorage::Internal(children) = &node.storage else {
                return current;
            };

            let mut target = node.count() - 1;
            for (index, routing_key) in node.keys.iter().enumerate().skip(1) {
                if routing_key > key {
                    target = index - 1;
                    break;
                }
            }
            current = children[target];
        }
    }

    /// Split a full node in two and return the half that should receive `key`.
    ///
    /// The upper half moves into a new right sibling whose leading key is
    /// promoted to the parent, splitting the parent first if it is full too.
    /// Keys equal to the sibling's leading key go right.
    fn split(&mut self, node_id: NodeId, key: &K) -> NodeId {
        let leaf = self.node(node_id).is_leaf();
        let sibling_id = self.create_node(leaf);
        let split_point = self.node(node_id).count() / 2;

        {
            let (node, sibling) = self.pair_mut(node_id, sibling_id);
            node.move_tail_into(split_point, sibling);
        }
        debug_assert_eq!(self.node(sibling_id).count(), self.order - split_point);

        if !leaf {
            for index in 0..self.node(sibling_id).count() {
                let child = self.node(sibling_id).children()[index];
                self.node_mut(child).parent = Some(sibling_id);
            }
        }

        // Chain the sibling in directly after the node.
        let old_next = self.node(node_id).next;
        {
            let sibling = self.node_mut(sibling_id);
            sibling.previous = Some(node_id);
            sibling.next = old_next;
        }
        self.node_mut(node_id).next = Some(sibling_id);
        if let Some(next) = old_next {
            self.node_mut(next).previous = Some(sibling_id);
        }

        let sibling_lead = self.node(sibling_id).keys[0].clone();
        tracing::trace!(
            node = self.node(node_id).id,
            sibling = self.node(sibling_id).id,
            leaf,
            split_point,
            "split node"
        );

        let parent = self.node(node_id).parent;
        match parent {
            None => {
                let root = self.create_node(false);
                let node_lead = self.node(node_id).keys[0].clone();
                self.insert_child(root, 0, node_lead, node_id);
                self.insert_child(root, 1, sibling_lead.clone(), sibling_id);
                self.root = Some(root);
                tracing::debug!(
                    root = self.node(root).id,
                    height = self.height(),
                    "tree grew a level"
                );
            }
            Some(parent) if self.node(parent).count() < self.order => {
                let position = self.child_position(parent, node_id);
                self.insert_child(parent, position + 1, sibling_lead.clone(), sibling_id);
            }
            Some(parent) => {
                let chosen = self.split(parent, &sibling_lead);
                // The parent's split may have moved the node into the new
                // half; the sibling belongs next to wherever the node is now.
                let parent = self.node(node_id).parent.unwrap_or(chosen);
                let position = self.child_position(parent, node_id);
                self.insert_child(parent, position + 1, sibling_lead.clone(), sibling_id);
            }
        }

        if *key < sibling_lead {
            node_id
        } else {
            sibling_id
        }
    }

    fn child_position(&self, parent: NodeId, child: NodeId) -> usize {
        let Some(position) = self.node(parent).index_of(child) else {
            unreachable!("node is not registered with its parent");
        };
        position
    }

    /// Place a record in a leaf with spare capacity.
    fn insert_record(&mut self, leaf: NodeId, key: K, record: Record<V>) {
        debug_assert!(self.node(leaf).count() < self.order, "leaf must be split first");
        let node = self.node_mut(leaf);
        let index = node.insert_index(&key);
        node.place_record(index, key, record);

        if index == 0 {
            self.update_parent_reference(leaf);
        }
    }

    /// Place a child in an internal node with spare capacity at `index`.
    ///
    /// The children are then rechained so that the first and last link to
    /// the node's exterior neighbours and the rest link to each other in
    /// their new order.
    fn insert_child(&mut self, parent: NodeId, index: usize, key: K, child: NodeId) {
        let (mut before, mut after) = {
            let children = self.node(parent).children();
            (
                children.first().and_then(|&first| self.node(first).previous),
                children.last().and_then(|&last| self.node(last).next),
            )
        };
        // The child may already be spliced into the chain next to its
        // neighbours; look past it for the true exterior.
        if before == Some(child) {
            before = self.node(child).previous;
        }
        if after == Some(child) {
            after = self.node(child).next;
        }

        self.node_mut(parent).place_child(index, key, child);
        self.node_mut(child).parent = Some(parent);
        self.relink_children(parent, before, after);

        if index == 0 {
            self.update_parent_reference(parent);
        }
    }

    fn relink_children(&mut self, parent: NodeId, before: Option<NodeId>, after: Option<NodeId>) {
        let count = self.node(parent).count();
        for index in 0..count {
            let children = self.node(parent).children();
            let current = children[index];
            let previous = if index == 0 {
                before
            } else {
                Some(children[index - 1])
            };
            let next = if index + 1 == count {
                after
            } else {
                Some(children[index + 1])
            };

            let node = self.node_mut(current);
            node.previous = previous;
            node.next = next;
        }

        let children = self.node(parent).children();
        let (first, last) = (children.first().copied(), children.last().copied());
        if let Some(before) = before {
            self.node_mut(before).next = first;
        }
        if let Some(after) = after {
            self.node_mut(after).previous = last;
        }
    }

    /// Copy a node's leading key into its parent, climbing while the node is
    /// its parent's first child.
    fn update_parent_reference(&mut self, node_id: NodeId) {
        let mut current = node_id;
        while let Some(parent) = self.node(current).parent {
            let position = self.child_position(parent, current);
            let lead = self.node(current).keys[0].clone();
            self.node_mut(parent).keys[position] = lead;

            if position != 0 {
                break;
            }
            current = parent;
        }
    }
}
