//! Pooled allocation of node buffers.
//!
//! Every node needs a key buffer plus either a record buffer (leaf) or a
//! child buffer (internal), each with capacity `order`. Instead of
//! allocating those one at a time on every split, the allocator keeps three
//! [`RingBuffer`] pools of spare buffers and refills a pool in one batch of
//! `preallocation_size` buffers when it runs dry. Node shells themselves live
//! in the tree's arena, which reserves room for at least that many more
//! nodes whenever it fills. The reservation is amortized, so the arena still
//! grows geometrically and a small batch size never forces a copy per batch.
//!
//! # Invariants
//!
//! - Every buffer handed out is empty with capacity of at least `order`
//! - With `preallocation_size <= 1` pooling is off and every request is a
//!   plain allocation
//! - Pools are only touched while the tree's exclusive lock is held

use crate::btree::node::{Node, NodeId, NodeStorage};
use crate::btree::record::Record;
use crate::config::TreeConfig;
use crate::pool::RingBuffer;

/// A pool of empty buffers of one element type.
#[derive(Debug)]
struct BufferPool<T> {
    name: &'static str,
    spare: RingBuffer<Vec<T>>,
    refills: u64,
}

impl<T> BufferPool<T> {
    fn new(name: &'static str, preallocation_size: usize) -> Self {
        Self {
            name,
            spare: RingBuffer::new(preallocation_size),
            refills: 0,
        }
    }

    /// Take a buffer, refilling the pool in one batch if it is empty.
    ///
    /// # Post-conditions
    /// - The returned buffer is empty with capacity `order`
    /// - After a refill the pool holds `preallocation_size - 1` spares
    fn take(&mut self, order: usize) -> Vec<T> {
        if let Some(buffer) = self.spare.pop() {
            return buffer;
        }

        self.refills += 1;
        let batch = self.spare.capacity();
        tracing::trace!(pool = self.name, batch, order, "refilling buffer pool");

        // Keep all but one of the batch; the last is handed out directly.
        for _ in 1..batch {
            if self.spare.push(Vec::with_capacity(order)).is_err() {
                break;
            }
        }
        Vec::with_capacity(order)
    }
}

/// Hands out node buffers and grows the node arena.
#[derive(Debug)]
pub(crate) struct NodeAllocator<K, V> {
    config: TreeConfig,
    key_sets: BufferPool<K>,
    record_sets: BufferPool<Record<V>>,
    child_sets: BufferPool<NodeId>,
    /// Times the arena ran out of room for node shells.
    shell_refills: u64,
}

impl<K: Ord, V> NodeAllocator<K, V> {
    pub(crate) fn new(config: TreeConfig) -> Self {
        let preallocation_size = config.preallocation_size();
        Self {
            config,
            key_sets: BufferPool::new("keys", preallocation_size),
            record_sets: BufferPool::new("records", preallocation_size),
            child_sets: BufferPool::new("children", preallocation_size),
            shell_refills: 0,
        }
    }

    /// Build a node with fresh buffers and append it to the arena.
    pub(crate) fn allocate(&mut self, nodes: &mut Vec<Node<K, V>>, id: u64, leaf: bool) -> NodeId {
        let keys = self.key_buffer();
        let storage = if leaf {
            NodeStorage::Leaf(self.record_buffer())
        } else {
            NodeStorage::Internal(self.child_buffer())
        };

        if self.config.pooling_enabled() && nodes.len() == nodes.capacity() {
            self.shell_refills += 1;
            let batch = self.config.preallocation_size();
            tracing::trace!(batch, capacity = nodes.capacity(), "growing node arena");
            nodes.reserve(batch);
        }

        let node_id = NodeId(nodes.len());
        nodes.push(Node::new(id, keys, storage));
        node_id
    }

    /// Total number of batch refills across all pools.
    pub(crate) const fn refills(&self) -> u64 {
        self.key_sets.refills
            + self.record_sets.refills
            + self.child_sets.refills
            + self.shell_refills
    }

    /// Times the arena was grown to make room for node shells.
    pub(crate) const fn arena_growths(&self) -> u64 {
        self.shell_refills
    }

    fn key_buffer(&mut self) -> Vec<K> {
        let order = self.config.order();
        if self.config.pooling_enabled() {
            self.key_sets.take(order)
        } else {
            Vec::with_capacity(order)
        }
    }

    fn record_buffer(&mut self) -> Vec<Record<V>> {
        let order = self.config.order();
        if self.config.pooling_enabled() {
            self.record_sets.take(order)
        } else {
            Vec::with_capacity(order)
        }
    }

    fn child_buffer(&mut self) -> Vec<NodeId> {
        let order = self.config.order();
        if self.config.pooling_enabled() {
            self.child_sets.take(order)
        } else {
            Vec::with_capacity(order)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator(order: usize, preallocation_size: usize) -> NodeAllocator<u32, u32> {
        NodeAllocator::new(TreeConfig::new(order, preallocation_size).unwrap())
    }

    #[test]
    fn test_unpooled_allocation() {
        let mut alloc = allocator(4, 0);
        let mut nodes = Vec::new();

        let leaf = alloc.allocate(&mut nodes, 1, true);
        let internal = alloc.allocate(&mut nodes, 2, false);

        assert_eq!(leaf, NodeId(0));
        assert_eq!(internal, NodeId(1));
        assert!(nodes[0].is_leaf());
        assert!(!nodes[1].is_leaf());
        assert!(nodes[0].keys.capacity() >= 4);
        assert_eq!(alloc.refills(), 0);
    }

    #[test]
    fn test_pool_refills_in_batches() {
        let mut pool = BufferPool::<u8>::new("test", 5);

        let first = pool.take(3);
        assert!(first.is_empty());
        assert!(first.capacity() >= 3);
        assert_eq!(pool.refills, 1);
        assert_eq!(pool.spare.count(), 4);

        for _ in 0..4 {
            let _ = pool.take(3);
        }
        assert_eq!(pool.refills, 1);
        assert_eq!(pool.spare.count(), 0);

        let _ = pool.take(3);
        assert_eq!(pool.refills, 2);
    }

    #[test]
    fn test_arena_grows_by_at_least_a_batch() {
        let mut alloc = allocator(3, 8);
        let mut nodes = Vec::new();

        for id in 1..=8 {
            alloc.allocate(&mut nodes, id, true);
        }
        assert!(nodes.capacity() >= 8);
        // One chunk of shells, one batch of keys, one batch of records.
        assert_eq!(alloc.refills(), 3);

        alloc.allocate(&mut nodes, 9, false);
        assert!(nodes.capacity() >= 16);
        assert_eq!(nodes[8].id, 9);
    }

    #[test]
    fn test_arena_growth_stays_geometric_for_small_batches() {
        let mut alloc = allocator(4, 2);
        let mut nodes = Vec::new();
        let mut reallocations = 0_u64;

        for id in 1..=100_000 {
            let capacity = nodes.capacity();
            alloc.allocate(&mut nodes, id, id % 2 == 0);
            if nodes.capacity() != capacity {
                reallocations += 1;
            }
        }

        // Doubling reaches 100_000 in well under 20 steps; a fixed step of 2
        // would need 50_000.
        assert!(reallocations <= 20, "{reallocations} arena reallocations");
        assert_eq!(alloc.arena_growths(), reallocations);
    }
}
