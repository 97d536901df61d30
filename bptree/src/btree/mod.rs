//! In-memory B+ tree index.
//!
//! This module provides the ordered index at the core of the crate.
//!
//! # Structure
//!
//! The tree consists of:
//! - Internal nodes: store routing keys and child indices
//! - Leaf nodes: store key-record pairs, doubly-linked for ordered scans
//!
//! Every level is chained left to right through sibling links, and every
//! node's leading key is mirrored in its parent.
//!
//! # Usage
//!
//! ```
//! use bptree::btree::BPlusTree;
//!
//! let tree = BPlusTree::new(4, 16).expect("order is valid");
//! tree.insert(3, "c");
//! tree.insert(1, "a");
//! tree.insert(3, "d");
//!
//! let pairs: Vec<_> = tree.scan().collect();
//! assert_eq!(pairs, vec![(1, "a"), (3, "c"), (3, "d")]);
//! assert_eq!(tree.count(), 3);
//! ```

mod alloc;
mod consistency;
mod node;
mod record;
mod scan;
mod tree;

pub use consistency::ConsistencyViolation;
pub use record::{Record, RecordId};
pub use scan::Scan;
pub use tree::{BPlusTree, TreeStats};
