//! CPU-based worker for vanity address generation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use secp256k1::Secp256k1;

use crate::crypto::Account;
use crate::matcher::Pattern;

use super::pool::{MatchCollector, VanityResult};

/// Statistics shared by all workers of a pool.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Total keys generated
    pub keys_generated: AtomicU64,
    /// Pattern hits, including ones discarded after the cap was reached
    pub matches_found: AtomicU64,
    /// Candidates that could not be generated
    pub errors: AtomicU64,
}

impl WorkerStats {
    /// Creates new worker stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total keys generated.
    pub fn total_keys(&self) -> u64 {
        self.keys_generated.load(Ordering::Relaxed)
    }

    /// Returns the total pattern hits.
    pub fn total_matches(&self) -> u64 {
        self.matches_found.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// A CPU worker that generates and tests keypairs.
pub(crate) struct CpuWorker {
    /// Worker ID
    id: usize,
    /// The pattern to match against
    pattern: Pattern,
    /// Shared capped result sequence
    collector: Arc<MatchCollector>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl CpuWorker {
    /// Creates a new CPU worker.
    pub(crate) fn new(
        id: usize,
        pattern: Pattern,
        collector: Arc<MatchCollector>,
        stop_flag: Arc<AtomicBool>,
        stats: Arc<WorkerStats>,
    ) -> Self {
        Self {
            id,
            pattern,
            collector,
            stop_flag,
            stats,
        }
    }

    /// Runs the worker loop.
    ///
    /// Generates keypairs and tests them against the pattern until:
    /// - The stop flag is set (checked before every candidate)
    /// - The collector refuses a match because the target count was reached
    pub(crate) fn run(&self) {
        // Flush the key counter in batches to reduce atomic operation overhead
        const BATCH_SIZE: u64 = 1000;

        let secp = Secp256k1::signing_only();
        let mut generated = 0u64;

        while !self.stop_flag.load(Ordering::Relaxed) {
            match Account::generate_with(&secp) {
                Ok(wallet) => {
                    generated += 1;

                    if self.pattern.matches(wallet.address()).is_match() {
                        self.stats.matches_found.fetch_add(1, Ordering::Relaxed);

                        let result = VanityResult {
                            wallet,
                            worker_id: self.id,
                        };
                        if !self.collector.offer(result) {
                            break;
                        }
                    }
                }
                Err(e) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    self.collector
                        .log()
                        .error(format!("worker {}: candidate skipped: {}", self.id, e));
                }
            }

            if generated == BATCH_SIZE {
                self.stats.keys_generated.fetch_add(generated, Ordering::Relaxed);
                generated = 0;
            }
        }

        self.stats.keys_generated.fetch_add(generated, Ordering::Relaxed);
        log::debug!("worker {} exiting", self.id);
    }
}
