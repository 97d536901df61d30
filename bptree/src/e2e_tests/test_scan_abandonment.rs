//! Test that a scan releases the tree lock however it ends.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crate::e2e_tests::helpers::{DEFAULT_TEST_PREALLOCATION, assert_consistent, tree_with};

fn insert_from_other_thread(tree: &crate::btree::BPlusTree<i32, i32>, key: i32) {
    thread::scope(|scope| {
        scope.spawn(|| tree.insert(key, key));
    });
}

#[test]
fn test_partial_scan_releases_lock() {
    let tree = tree_with(3, DEFAULT_TEST_PREALLOCATION, (0..100).map(|key| (key, key)));

    let first: Vec<(i32, i32)> = tree.scan().take(3).collect();
    assert_eq!(first, vec![(0, 0), (1, 1), (2, 2)]);

    insert_from_other_thread(&tree, 1_000);
    assert_eq!(tree.count(), 101);
}

#[test]
fn test_break_out_of_scan_loop_releases_lock() {
    let tree = tree_with(3, DEFAULT_TEST_PREALLOCATION, (0..100).map(|key| (key, key)));

    let mut seen = 0;
    for (key, _) in tree.scan() {
        if key == 10 {
            break;
        }
        seen += 1;
    }
    assert_eq!(seen, 10);

    insert_from_other_thread(&tree, -1);
    assert_eq!(tree.scan().next(), Some((-1, -1)));
}

#[test]
fn test_panicking_consumer_releases_lock() {
    let tree = tree_with(3, DEFAULT_TEST_PREALLOCATION, (0..100).map(|key| (key, key)));

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        for (key, _) in tree.scan() {
            assert!(key < 50, "consumer gave up at {key}");
        }
    }));
    assert!(result.is_err());

    insert_from_other_thread(&tree, 500);
    assert_eq!(tree.count(), 101);
    assert_consistent(&tree, "after abandoned scan");
}
