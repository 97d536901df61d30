//! Test how the first split divides a full leaf.

use crate::e2e_tests::helpers::{assert_consistent, leaf_keys, tree_with};

#[test]
fn test_order_plus_one_increasing_keys() {
    for order in 2..=12 {
        let keys = 1..=i32::try_from(order).unwrap() + 1;
        let tree = tree_with(order, 0, keys.clone().map(|key| (key, key)));

        let split_point = i32::try_from(order / 2).unwrap();
        let left: Vec<i32> = (1..=split_point).collect();
        let right: Vec<i32> = (split_point + 1..=*keys.end()).collect();
        assert_eq!(leaf_keys(&tree), vec![left, right], "order {order}");

        let stats = tree.stats();
        assert_eq!(stats.height, 2);
        // Two leaves and the new root.
        assert_eq!(stats.node_count, 3);
        assert_consistent(&tree, &format!("order {order}"));
    }
}

#[test]
fn test_order_two_scenario() {
    let tree = tree_with(2, 0, [(1, "a"), (2, "b")]);
    assert_eq!(leaf_keys(&tree), vec![vec![1, 2]]);
    assert_eq!(tree.stats().height, 1);

    tree.insert(3, "c");
    assert_eq!(leaf_keys(&tree), vec![vec![1], vec![2, 3]]);
    assert_eq!(tree.stats().height, 2);

    let pairs: Vec<(i32, &str)> = tree.scan().collect();
    assert_eq!(pairs, vec![(1, "a"), (2, "b"), (3, "c")]);
}

#[test]
fn test_pivot_tie_goes_right() {
    // Full leaf [10, 20, 30, 40] splits at 2; 30 equals the new lead key.
    let tree = tree_with(4, 0, [10, 20, 30, 40].map(|key| (key, "old")));
    tree.insert(30, "new");

    assert_eq!(leaf_keys(&tree), vec![vec![10, 20], vec![30, 30, 40]]);
    let pairs: Vec<(i32, &str)> = tree.scan().collect();
    assert_eq!(pairs[2], (30, "old"));
    assert_eq!(pairs[3], (30, "new"));
}

#[test]
fn test_descending_inserts_keep_leading_keys() {
    let tree = tree_with(3, 0, (0..100).rev().map(|key| (key, key)));

    let keys: Vec<i32> = tree.scan().map(|(key, _)| key).collect();
    assert_eq!(keys, (0..100).collect::<Vec<_>>());
    assert_consistent(&tree, "descending inserts");
}
