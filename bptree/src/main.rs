// Forbid unwrap() in production code to prevent panics from corrupt data.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::time::Instant;

use bptree::{BPlusTree, TreeConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Distinct keys in the shuffled insert sequence; inserts past this cycle
/// through it again and land as duplicates.
const PERMUTATION_SIZE: u64 = 5_000_000;
/// Inserts between two rate reports.
const REPORT_INTERVAL: usize = 1_000_000;
/// Hard stop, reached only if no interval runs over the time threshold.
const MAX_INSERTS: usize = 20_000_000;
/// An interval slower than this ends the run.
const SLOW_INTERVAL_SECS: f64 = 1.0;
const SEED: u64 = 0;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bptree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match TreeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: order={}, preallocation_size={}",
        config.order(),
        config.preallocation_size()
    );

    let mut keys: Vec<u64> = (0..PERMUTATION_SIZE).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(SEED));

    let tree = BPlusTree::with_config(config);
    let inserted = run_inserts(&tree, &keys);
    tracing::info!("Finished after {inserted} inserts, checking consistency");

    tree.check_consistency();

    let stats = tree.stats();
    tracing::info!(
        order = stats.order,
        nodes = stats.node_count,
        records = stats.record_count,
        height = stats.height,
        pool_refills = stats.pool_refills,
        "final tree stats"
    );
}

/// Insert keys until an interval is slower than the threshold or the cap is
/// hit. Returns the number of inserts performed.
#[allow(clippy::cast_precision_loss)]
fn run_inserts(tree: &BPlusTree<u64, usize>, keys: &[u64]) -> usize {
    let mut interval_start = Instant::now();
    let mut inserted = 0;

    for (i, &key) in keys.iter().cycle().enumerate().take(MAX_INSERTS) {
        if i > 0 && i % REPORT_INTERVAL == 0 {
            let elapsed = interval_start.elapsed().as_secs_f64();
            let rate = REPORT_INTERVAL as f64 / elapsed;
            tracing::info!(
                "Inserted {REPORT_INTERVAL} items in {elapsed:.2}s (Rate={:.2} M/sec, Total={}M)",
                rate / 1_000_000.0,
                i / 1_000_000
            );
            interval_start = Instant::now();

            if elapsed > SLOW_INTERVAL_SECS {
                tracing::info!("Interval exceeded {SLOW_INTERVAL_SECS}s, stopping");
                return i;
            }
        }

        tree.insert(key, i);
        inserted += 1;
    }

    inserted
}
