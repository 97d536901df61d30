//! Test that duplicate keys are kept as separate records in insertion order.

use crate::e2e_tests::helpers::{DEFAULT_TEST_PREALLOCATION, assert_consistent, tree_with};

#[test]
fn test_three_equal_keys() {
    let tree = tree_with(4, DEFAULT_TEST_PREALLOCATION, [(5, 'a'), (5, 'b'), (5, 'c')]);

    let pairs: Vec<(i32, char)> = tree.scan().collect();
    assert_eq!(pairs, vec![(5, 'a'), (5, 'b'), (5, 'c')]);
}

#[test]
fn test_duplicates_stay_stable_across_splits() {
    for order in [2, 3, 5, 8] {
        let inserts: Vec<(u32, u32)> = (0..300).map(|i| (i % 7, i)).collect();
        let tree = tree_with(order, DEFAULT_TEST_PREALLOCATION, inserts.iter().copied());

        let mut expected = inserts;
        // Stable sort: equal keys keep their insertion order.
        expected.sort_by_key(|&(key, _)| key);

        let pairs: Vec<(u32, u32)> = tree.scan().collect();
        assert_eq!(pairs, expected, "order {order}");
        assert_consistent(&tree, &format!("order {order}"));
    }
}

#[test]
fn test_single_key_repeated() {
    let tree = tree_with(3, 0, (0..50).map(|i| ("same", i)));

    let values: Vec<i32> = tree.scan().map(|(_, value)| value).collect();
    assert_eq!(values, (0..50).collect::<Vec<_>>());
    assert_eq!(tree.count(), 50);
    assert!(tree.stats().height > 1);
}
