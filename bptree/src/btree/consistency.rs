//! Diagnostics: tree dumps and the consistency checker.
//!
//! None of this runs on the insert or scan paths. The checker walks every
//! level of the tree from its leftmost node along the sibling chain and
//! verifies:
//! - keys never decrease along a level
//! - `previous.next` and `next.previous` point back at each node
//! - each node is registered as a child of its parent, under its own
//!   leading key
//!
//! A failing check annotates the offending nodes, dumps the tree to stderr
//! and panics.

use std::fmt::{self, Debug};
use std::io::{self, Write};

use crate::btree::node::NodeId;
use crate::btree::tree::{BPlusTree, TreeState};

/// Annotation for nodes with broken ordering or sibling links.
const ANNOTATION_FAIL: &str = "FAIL";
/// Annotation for nodes missing from their parent's children.
const ANNOTATION_ORPHAN: &str = "ORPHAN";

/// A structural problem found by [`BPlusTree::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// A key is smaller than one seen earlier on the same level.
    KeyRewound { node: u64, from: String, to: String },
    /// The previous sibling's `next` does not point back at the node.
    BrokenNextLink { node: u64, previous: u64 },
    /// The next sibling's `previous` does not point back at the node.
    BrokenPreviousLink { node: u64, next: u64 },
    /// The node is not among its parent's children.
    Orphan { node: u64, parent: u64 },
    /// The parent's routing key differs from the node's leading key.
    LeadKeyMismatch { node: u64, parent: u64 },
    /// Following `next` links revisited a node.
    ChainCycle { node: u64 },
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyRewound { node, from, to } => {
                write!(f, "NODE({node}) had a rewind: key rewound from {from} to {to}")
            }
            Self::BrokenNextLink { node, previous } => write!(
                f,
                "NODE({node}) previous sibling ({previous}) does not link next to it"
            ),
            Self::BrokenPreviousLink { node, next } => write!(
                f,
                "NODE({node}) next sibling ({next}) does not link previous to it"
            ),
            Self::Orphan { node, parent } => {
                write!(f, "NODE({node}) is not registered to its parent ({parent})")
            }
            Self::LeadKeyMismatch { node, parent } => write!(
                f,
                "NODE({node}) leading key differs from its routing key in parent ({parent})"
            ),
            Self::ChainCycle { node } => write!(f, "NODE({node}) sibling chain loops"),
        }
    }
}

impl<K: Ord + Clone + Debug, V: Debug> BPlusTree<K, V> {
    /// Write a nested textual view of the whole tree.
    pub fn dump<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        self.read_state().dump(sink)
    }

    /// Walk every level and collect structural violations.
    ///
    /// Offending nodes are annotated (`FAIL` or `ORPHAN`) so a later dump
    /// shows where the damage is, which is why this takes the exclusive lock.
    pub fn verify(&self) -> Result<(), Vec<ConsistencyViolation>> {
        let mut state = self.write_state();
        let violations = state.check_levels();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Verify the tree and abort on any violation.
    ///
    /// # Panics
    ///
    /// Panics after dumping the tree to stderr if any check fails.
    pub fn check_consistency(&self) {
        self.check_consistency_into(&mut io::stderr().lock());
    }

    /// [`Self::check_consistency`] with the failure dump sent to `sink`.
    pub(crate) fn check_consistency_into<W: Write>(&self, sink: &mut W) {
        let mut state = self.write_state();
        let violations = state.check_levels();
        if violations.is_empty() {
            tracing::info!("tree consistent");
            return;
        }

        for violation in &violations {
            tracing::error!("{violation}");
        }
        if let Err(e) = state.dump(sink) {
            tracing::error!("Failed to dump inconsistent tree: {e}");
        }
        drop(state);
        panic!(
            "inconsistent tree state: {} violation(s), first: {}",
            violations.len(),
            violations[0]
        );
    }
}

impl<K: Ord + Clone + Debug, V: Debug> TreeState<K, V> {
    fn dump<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        writeln!(
            sink,
            "========== TREE DUMP (Order: {}, NodesTotal: {}, Records: {}) ===========",
            self.order, self.node_count, self.record_count
        )?;
        self.dump_node(sink, self.root, 1)
    }

    fn dump_node<W: Write>(
        &self,
        sink: &mut W,
        id: Option<NodeId>,
        depth: usize,
    ) -> io::Result<()> {
        let prefix = format!("{}-", "\t|".repeat(depth));
        let Some(id) = id else {
            return writeln!(sink, "{prefix}(Empty)");
        };

        let node = self.node(id);
        writeln!(
            sink,
            "{prefix}NODE({}) [Leaf={}, Count={}] {:?}",
            node.id,
            node.is_leaf(),
            node.count(),
            node.annotation
        )?;
        writeln!(
            sink,
            "{prefix}  Prev: {} | Parent: {} | Next: {}",
            self.describe(node.previous),
            self.describe(node.parent),
            self.describe(node.next)
        )?;

        if node.is_leaf() {
            for (index, (key, record)) in node.keys.iter().zip(node.records()).enumerate() {
                writeln!(
                    sink,
                    "{prefix}- RECORD {index} [Key: {key:?}, Record #: {}, Value: {:?}]",
                    record.record_id, record.value
                )?;
            }
        } else {
            for (index, (key, &child)) in node.keys.iter().zip(node.children()).enumerate() {
                writeln!(
                    sink,
                    "{prefix}- CHILD #{index} [Key: {key:?}] NODE({})",
                    self.node(child).id
                )?;
                self.dump_node(sink, Some(child), depth + 1)?;
            }
        }

        Ok(())
    }

    fn describe(&self, link: Option<NodeId>) -> String {
        link.map_or_else(|| "(none)".to_string(), |id| self.node(id).id.to_string())
    }

    /// One representative per level, root first: the leftmost leaf and its
    /// chain of parents, reversed.
    fn leftmost_per_level(&self) -> Vec<NodeId> {
        let mut levels = Vec::new();
        let mut current = self.leftmost_leaf();
        while let Some(id) = current {
            levels.push(id);
            current = self.node(id).parent;
        }
        levels.reverse();
        levels
    }

    fn check_levels(&mut self) -> Vec<ConsistencyViolation> {
        let mut violations = Vec::new();
        for (level, leftmost) in self.leftmost_per_level().into_iter().enumerate() {
            tracing::info!(level, leftmost = self.node(leftmost).id, "consistency checking level");
            self.check_level(leftmost, &mut violations);
        }
        violations
    }

    /// Check one level, starting from its leftmost node.
    fn check_level(&mut self, leftmost: NodeId, violations: &mut Vec<ConsistencyViolation>) {
        let chain = self.collect_chain(leftmost, violations);

        // Ordering along the whole level.
        let mut highest: Option<&K> = None;
        let mut rewound = None;
        'order: for &id in &chain {
            for key in &self.node(id).keys {
                if let Some(previous) = highest
                    && key < previous
                {
                    rewound = Some((id, format!("{previous:?}"), format!("{key:?}")));
                    break 'order;
                }
                highest = Some(key);
            }
        }
        if let Some((id, from, to)) = rewound {
            self.node_mut(id).annotation = ANNOTATION_FAIL;
            violations.push(ConsistencyViolation::KeyRewound {
                node: self.node(id).id,
                from,
                to,
            });
        }

        for &id in &chain {
            self.check_links(id, violations);
            self.check_parent(id, violations);
        }
    }

    /// Nodes reachable along `next` links, stopping if one repeats.
    fn collect_chain(
        &self,
        leftmost: NodeId,
        violations: &mut Vec<ConsistencyViolation>,
    ) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(leftmost);
        while let Some(id) = current {
            if chain.len() >= self.nodes.len() {
                violations.push(ConsistencyViolation::ChainCycle {
                    node: self.node(id).id,
                });
                break;
            }
            chain.push(id);
            current = self.node(id).next;
        }
        chain
    }

    fn check_links(&mut self, id: NodeId, violations: &mut Vec<ConsistencyViolation>) {
        let node = self.node(id);
        let mut failed = false;

        if let Some(previous) = node.previous
            && self.node(previous).next != Some(id)
        {
            violations.push(ConsistencyViolation::BrokenNextLink {
                node: node.id,
                previous: self.node(previous).id,
            });
            failed = true;
        }
        if let Some(next) = node.next
            && self.node(next).previous != Some(id)
        {
            violations.push(ConsistencyViolation::BrokenPreviousLink {
                node: node.id,
                next: self.node(next).id,
            });
            failed = true;
        }

        if failed {
            self.node_mut(id).annotation = ANNOTATION_FAIL;
        }
    }

    fn check_parent(&mut self, id: NodeId, violations: &mut Vec<ConsistencyViolation>) {
        let node = self.node(id);
        let Some(parent_id) = node.parent else {
            return;
        };
        let parent = self.node(parent_id);

        match parent.index_of(id) {
            None => {
                violations.push(ConsistencyViolation::Orphan {
                    node: node.id,
                    parent: parent.id,
                });
                self.node_mut(id).annotation = ANNOTATION_ORPHAN;
            }
            Some(position) if parent.keys[position] != node.keys[0] => {
                violations.push(ConsistencyViolation::LeadKeyMismatch {
                    node: node.id,
                    parent: parent.id,
                });
                self.node_mut(id).annotation = ANNOTATION_FAIL;
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated(order: usize, keys: impl IntoIterator<Item = i32>) -> BPlusTree<i32, i32> {
        let tree = BPlusTree::new(order, 0).unwrap();
        for key in keys {
            tree.insert(key, key);
        }
        tree
    }

    fn dump_string(tree: &BPlusTree<i32, i32>) -> String {
        let mut out = Vec::new();
        tree.dump(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_dump_empty_tree() {
        let tree = populated(3, []);
        let dump = dump_string(&tree);
        assert!(dump.starts_with("========== TREE DUMP (Order: 3, NodesTotal: 0, Records: 0)"));
        assert!(dump.contains("(Empty)"));
    }

    #[test]
    fn test_dump_nested_view() {
        let tree = populated(2, [1, 2, 3]);
        let dump = dump_string(&tree);

        assert!(dump.contains("NODE(3) [Leaf=false, Count=2] \"\""));
        assert!(dump.contains("- CHILD #0 [Key: 1] NODE(1)"));
        assert!(dump.contains("- CHILD #1 [Key: 2] NODE(2)"));
        assert!(dump.contains("RECORD 1 [Key: 3, Record #: 3, Value: 3]"));
        assert!(dump.contains("Prev: 1 | Parent: 3 | Next: (none)"));
        assert!(dump.contains("\t|\t|-NODE(2)"));
    }

    #[test]
    fn test_verify_passes_on_healthy_tree() {
        let tree = populated(3, (0..500).map(|i| (i * 37) % 101));
        assert_eq!(tree.verify(), Ok(()));
        tree.check_consistency();
    }

    #[test]
    fn test_verify_detects_broken_link() {
        let tree = populated(2, 0..8);
        {
            let mut state = tree.write_state();
            let leaf = state.leftmost_leaf().unwrap();
            let next = state.node(leaf).next.unwrap();
            state.node_mut(next).previous = None;
        }

        let violations = tree.verify().unwrap_err();
        assert!(
            violations
                .iter()
                .any(|v| matches!(v, ConsistencyViolation::BrokenPreviousLink { .. }))
        );
        assert!(dump_string(&tree).contains("\"FAIL\""));
    }

    #[test]
    fn test_verify_detects_rewound_keys_and_orphans() {
        let tree = populated(2, 0..8);
        {
            let mut state = tree.write_state();
            let leaf = state.leftmost_leaf().unwrap();
            let next = state.node(leaf).next.unwrap();
            state.node_mut(next).keys[0] = -5;

            let parent = state.node(leaf).parent.unwrap();
            let detached = state.node(parent).children()[0];
            let stranger = state.node(parent).next.unwrap();
            state.node_mut(detached).parent = Some(stranger);
        }

        let violations = tree.verify().unwrap_err();
        assert!(violations.iter().any(|v| matches!(v, ConsistencyViolation::KeyRewound { .. })));
        assert!(violations.iter().any(|v| matches!(v, ConsistencyViolation::Orphan { .. })));
        assert!(dump_string(&tree).contains("\"ORPHAN\""));
    }

    #[test]
    fn test_verify_detects_cycle() {
        let tree = populated(2, 0..6);
        {
            let mut state = tree.write_state();
            let leaf = state.leftmost_leaf().unwrap();
            let next = state.node(leaf).next.unwrap();
            state.node_mut(next).next = Some(leaf);
        }

        let violations = tree.verify().unwrap_err();
        assert!(violations.iter().any(|v| matches!(v, ConsistencyViolation::ChainCycle { .. })));
    }

    #[test]
    #[should_panic(expected = "inconsistent tree state")]
    fn test_check_consistency_is_fatal() {
        let tree = populated(2, 0..8);
        {
            let mut state = tree.write_state();
            let leaf = state.leftmost_leaf().unwrap();
            let next = state.node(leaf).next.unwrap();
            state.node_mut(next).previous = Some(next);
        }
        tree.check_consistency();
    }

    /// Sink that rejects every write.
    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    #[should_panic(expected = "inconsistent tree state")]
    fn test_check_consistency_survives_failed_dump() {
        let tree = populated(2, 0..8);
        {
            let mut state = tree.write_state();
            let leaf = state.leftmost_leaf().unwrap();
            state.node_mut(leaf).keys[0] = 100;
        }
        tree.check_consistency_into(&mut BrokenSink);
    }

    #[test]
    fn test_check_consistency_dumps_into_sink() {
        let tree = populated(2, 0..8);
        {
            let mut state = tree.write_state();
            let leaf = state.leftmost_leaf().unwrap();
            let next = state.node(leaf).next.unwrap();
            state.node_mut(next).previous = None;
        }

        let mut sink = Vec::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tree.check_consistency_into(&mut sink);
        }));
        assert!(result.is_err());

        let dump = String::from_utf8(sink).unwrap();
        assert!(dump.starts_with("========== TREE DUMP (Order: 2"));
        assert!(dump.contains("\"FAIL\""));
    }

    #[test]
    fn test_violation_display() {
        let violation = ConsistencyViolation::KeyRewound {
            node: 4,
            from: "9".to_string(),
            to: "2".to_string(),
        };
        assert_eq!(violation.to_string(), "NODE(4) had a rewind: key rewound from 9 to 2");
    }
}
