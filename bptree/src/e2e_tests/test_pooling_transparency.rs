//! Test that buffer pooling never changes what the tree stores.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::e2e_tests::helpers::tree_with;

fn random_inserts(count: usize) -> Vec<(u32, usize)> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count).map(|i| (rng.random_range(0..500), i)).collect()
}

#[test]
fn test_same_contents_for_every_preallocation() {
    let inserts = random_inserts(2_000);

    for order in [2, 5, 27] {
        let baseline = tree_with(order, 0, inserts.iter().copied());
        let expected: Vec<(u32, usize)> = baseline.scan().collect();
        assert_eq!(expected.len(), inserts.len());

        for preallocation_size in [1, 2, 100, 4096] {
            let tree = tree_with(order, preallocation_size, inserts.iter().copied());
            let pairs: Vec<(u32, usize)> = tree.scan().collect();
            assert_eq!(
                pairs, expected,
                "order {order}, preallocation {preallocation_size}"
            );
            assert_eq!(tree.count(), baseline.count());
            assert_eq!(tree.stats().node_count, baseline.stats().node_count);
        }
    }
}

#[test]
fn test_pooling_disabled_below_two() {
    let inserts = random_inserts(500);

    for preallocation_size in [0, 1] {
        let tree = tree_with(4, preallocation_size, inserts.iter().copied());
        assert_eq!(tree.stats().pool_refills, 0);
    }

    let pooled = tree_with(4, 16, inserts.iter().copied());
    assert!(pooled.stats().pool_refills > 0);
}
