//! Test the sentence insert set at every order from 2 upwards.

use crate::e2e_tests::helpers::{
    DEFAULT_TEST_PREALLOCATION, SENTENCE_INSERTS, assert_ascending, assert_consistent, tree_with,
};

#[test]
fn test_sentence_inserts_at_every_order() {
    for order in 2..SENTENCE_INSERTS.len() {
        let tree = tree_with(order, DEFAULT_TEST_PREALLOCATION, []);

        for (inserted, &(key, word)) in SENTENCE_INSERTS.iter().enumerate() {
            tree.insert(key, word);

            let pairs: Vec<(i32, &str)> = tree.scan().collect();
            assert_ascending(&pairs);
            assert_eq!(pairs.len(), inserted + 1, "order {order}, after key {key}");
            assert_eq!(tree.count(), inserted + 1);
            assert_consistent(&tree, &format!("order {order}, after key {key}"));
        }
    }
}

#[test]
fn test_sentence_reads_back_in_key_order() {
    let tree = tree_with(4, DEFAULT_TEST_PREALLOCATION, SENTENCE_INSERTS);

    let words: Vec<&str> = tree.scan().map(|(_, word)| word).collect();
    assert_eq!(
        words.join(" "),
        "This sentence should make some sense eventually but maybe not immediately \
         unless you think about it . Sometimes keys come in order"
    );
}

#[test]
fn test_record_ids_follow_insert_order() {
    let tree = tree_with(3, DEFAULT_TEST_PREALLOCATION, []);

    for (inserted, &(key, word)) in SENTENCE_INSERTS.iter().enumerate() {
        let record_id = tree.insert(key, word);
        assert_eq!(record_id, inserted as u64 + 1);
    }
    assert_eq!(tree.stats().record_count, 22);
}
