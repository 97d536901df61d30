//! Test a large run of random inserts, verifying the structure as it grows.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::e2e_tests::helpers::{DEFAULT_TEST_PREALLOCATION, assert_consistent, tree_with};

const ORDER: usize = 5;
const DATA_SIZE: usize = 10_000;
const VERIFY_INTERVAL: usize = 1_000;
const MAX_KEY: u32 = 1_000_000;

#[test]
fn test_bulk_insert_with_verify() {
    let mut rng = StdRng::seed_from_u64((ORDER * DATA_SIZE) as u64);
    let tree = tree_with(ORDER, DEFAULT_TEST_PREALLOCATION, []);
    let mut inserted = Vec::with_capacity(DATA_SIZE);

    for i in 0..DATA_SIZE {
        let key = rng.random_range(0..MAX_KEY);
        tree.insert(key, i);
        inserted.push((key, i));

        if (i + 1) % VERIFY_INTERVAL == 0 {
            assert_eq!(tree.count(), i + 1, "failed inserting {key}");
            assert_consistent(&tree, &format!("after {} inserts", i + 1));
        }
    }

    inserted.sort_by_key(|&(key, _)| key);
    let pairs: Vec<(u32, usize)> = tree.scan().collect();
    assert_eq!(pairs, inserted);

    let stats = tree.stats();
    assert_eq!(stats.record_count, DATA_SIZE as u64);
    assert!(stats.height >= 5);
}

#[test]
fn test_sequential_inserts_large_order() {
    let tree = tree_with(27, DEFAULT_TEST_PREALLOCATION, (0..50_000u32).map(|key| (key, ())));

    assert_eq!(tree.count(), 50_000);
    let keys: Vec<u32> = tree.scan().map(|(key, ())| key).collect();
    assert!(keys.iter().copied().eq(0..50_000));
    assert_consistent(&tree, "sequential inserts");
}
