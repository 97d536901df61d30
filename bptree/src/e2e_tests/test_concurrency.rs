//! Test readers scanning while a writer inserts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::e2e_tests::helpers::{
    DEFAULT_TEST_PREALLOCATION, assert_ascending, assert_consistent, tree_with,
};

const WRITES: u32 = 3_000;
const READERS: usize = 4;

#[test]
fn test_readers_see_growing_sorted_snapshots() {
    let tree = tree_with(6, DEFAULT_TEST_PREALLOCATION, []);
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for _ in 0..READERS {
            scope.spawn(|| {
                let mut last_len = 0;
                while !done.load(Ordering::Acquire) {
                    let pairs: Vec<(u32, u32)> = tree.scan().collect();
                    assert_ascending(&pairs);
                    assert!(pairs.len() >= last_len, "scan went backwards");
                    last_len = pairs.len();
                }
            });
        }

        scope.spawn(|| {
            for i in 0..WRITES {
                // Interleave low and high keys so splits hit both ends.
                let key = if i % 2 == 0 { i } else { WRITES * 2 - i };
                tree.insert(key, i);
            }
            done.store(true, Ordering::Release);
        });
    });

    assert_eq!(tree.count(), WRITES as usize);
    assert_consistent(&tree, "after concurrent writes");
}

#[test]
fn test_record_ids_unique_across_writers() {
    let tree = tree_with(4, DEFAULT_TEST_PREALLOCATION, []);

    let mut ids: Vec<u64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4u32)
            .map(|writer| {
                let tree = &tree;
                scope.spawn(move || {
                    (0..250u32)
                        .map(|i| tree.insert(i, writer))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    ids.sort_unstable();
    assert_eq!(ids, (1..=1_000).collect::<Vec<u64>>());
    assert_eq!(tree.count(), 1_000);
}
