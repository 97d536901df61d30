//! Common helpers for end-to-end tests.

use std::fmt::Debug;
use std::io::Write;

use crate::btree::BPlusTree;

/// Preallocation size used unless a test is about pooling.
pub const DEFAULT_TEST_PREALLOCATION: usize = 100;

/// Words of a sentence keyed by their position, inserted out of order so that
/// splits happen at the front, middle and back of the tree.
pub const SENTENCE_INSERTS: [(i32, &str); 22] = [
    (16, "maybe"),
    (5, "should"),
    (15, "but"),
    (32, "about"),
    (25, "you"),
    (3, "sentence"),
    (8, "some"),
    (12, "eventually"),
    (7, "make"),
    (42, "it"),
    (1, "This"),
    (22, "unless"),
    (20, "not"),
    (11, "sense"),
    (21, "immediately"),
    (43, "."),
    (44, "Sometimes"),
    (45, "keys"),
    (46, "come"),
    (47, "in"),
    (48, "order"),
    (30, "think"),
];

/// Build a tree and insert `pairs` in order.
pub fn tree_with<K, V>(
    order: usize,
    preallocation_size: usize,
    pairs: impl IntoIterator<Item = (K, V)>,
) -> BPlusTree<K, V>
where
    K: Ord + Clone,
{
    let tree = BPlusTree::new(order, preallocation_size).expect("test order is valid");
    for (key, value) in pairs {
        tree.insert(key, value);
    }
    tree
}

/// Keys of each leaf, walking the leaf chain left to right.
pub fn leaf_keys<K: Ord + Clone, V>(tree: &BPlusTree<K, V>) -> Vec<Vec<K>> {
    let state = tree.read_state();
    let mut leaves = Vec::new();
    let mut current = state.leftmost_leaf();
    while let Some(id) = current {
        leaves.push(state.node(id).keys.clone());
        current = state.node(id).next;
    }
    leaves
}

/// Assert that scanned pairs come out in non-decreasing key order.
pub fn assert_ascending<K: Ord + Debug, V>(pairs: &[(K, V)]) {
    for window in pairs.windows(2) {
        assert!(
            window[0].0 <= window[1].0,
            "keys out of order: {:?} before {:?}",
            window[0].0,
            window[1].0
        );
    }
}

/// Assert that the tree passes every consistency check.
///
/// On failure the dump is written to a kept temporary file whose path is
/// part of the panic message.
pub fn assert_consistent<K, V>(tree: &BPlusTree<K, V>, context: &str)
where
    K: Ord + Clone + Debug,
    V: Debug,
{
    let Err(violations) = tree.verify() else {
        return;
    };

    let mut file = tempfile::Builder::new()
        .prefix("bptree_dump_")
        .suffix(".txt")
        .tempfile()
        .expect("Failed to create dump file");
    tree.dump(&mut file).expect("Failed to write dump");
    file.flush().expect("Failed to flush dump");
    let (_, path) = file.keep().expect("Failed to keep dump file");

    panic!(
        "{context}: {} violation(s), first: {}; dump saved to {}",
        violations.len(),
        violations[0],
        path.display()
    );
}
