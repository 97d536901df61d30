//! An in-memory, ordered key-value index built as a B+ tree.
//!
//! - [`btree`]: the tree itself, its ordered scan and diagnostics
//! - [`config`]: construction parameters, optionally loaded from the environment
//! - [`pool`]: the bounded FIFO pool the tree recycles node buffers through
//!
//! Inserts are O(log n), duplicate keys are kept as separate records in
//! insertion order, and a full ascending scan follows the leaf chain.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod btree;
pub mod config;
pub mod pool;

mod e2e_tests;

pub use btree::{BPlusTree, ConsistencyViolation, Record, RecordId, Scan, TreeStats};
pub use config::{ConfigError, TreeConfig};
