//! End-to-end tests over the public tree API.
//!
//! Each test file covers a specific scenario, using deterministic inputs
//! (fixed insert sets or seeded randomness) so failures reproduce.

#![cfg(test)]

mod helpers;

mod test_basic_inserts;
mod test_bulk_random;
mod test_concurrency;
mod test_duplicates;
mod test_pooling_transparency;
mod test_scan_abandonment;
mod test_split_partition;
