//! Worker pool management.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::crypto::Account;
use crate::log_buffer::LogBuffer;
use crate::matcher::Pattern;

use super::cpu::{CpuWorker, WorkerStats};

/// Errors that keep a search from starting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("thread count must be a positive integer")]
    InvalidThreads,

    #[error("wallet count must be a positive integer")]
    InvalidTarget,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// A wallet whose address matched the pattern.
#[derive(Debug, Clone)]
pub struct VanityResult {
    /// The matching key and its address
    pub wallet: Account,
    /// The ID of the worker that found this result
    pub worker_id: usize,
}

impl VanityResult {
    /// The address, checksummed with 0x prefix.
    pub fn address(&self) -> String {
        self.wallet.address().to_checksum()
    }

    /// The private key, `0x` + lowercase hex.
    pub fn private_key(&self) -> String {
        self.wallet.private_key().to_hex_prefixed()
    }
}

/// Append-only result sequence capped at the target count.
///
/// Appends take the lock, so the cap check and the push happen as one step.
pub(crate) struct MatchCollector {
    target: usize,
    results: Mutex<Vec<VanityResult>>,
    result_tx: Sender<VanityResult>,
    stop_flag: Arc<AtomicBool>,
    log: Arc<LogBuffer>,
}

impl MatchCollector {
    fn new(
        target: usize,
        result_tx: Sender<VanityResult>,
        stop_flag: Arc<AtomicBool>,
        log: Arc<LogBuffer>,
    ) -> Self {
        Self {
            target,
            results: Mutex::new(Vec::with_capacity(target.min(1024))),
            result_tx,
            stop_flag,
            log,
        }
    }

    /// Appends a match unless the cap is already reached. Returns false (and discards the
    /// match) once full; reaching the cap raises the stop flag.
    pub(crate) fn offer(&self, result: VanityResult) -> bool {
        let mut results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        if results.len() >= self.target {
            return false;
        }

        self.log.success(format!(
            "{} ({}/{}, worker {})",
            result.address(),
            results.len() + 1,
            self.target,
            result.worker_id
        ));
        // Receiver may be gone if the caller only reads the snapshot.
        let _ = self.result_tx.send(result.clone());
        results.push(result);

        if results.len() >= self.target {
            self.stop_flag.store(true, Ordering::Relaxed);
        }
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.results.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub(crate) fn snapshot(&self) -> Vec<VanityResult> {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn log(&self) -> &LogBuffer {
        &self.log
    }
}

/// Manages a pool of workers for parallel vanity address generation.
pub struct WorkerPool {
    /// Number of workers
    num_workers: usize,
    /// The pattern to search for
    pattern: Pattern,
    /// Worker thread handles (Option to allow taking during join)
    handles: Option<Vec<JoinHandle<()>>>,
    /// Matches in the order they were accepted
    collector: Arc<MatchCollector>,
    /// Channel receiver for results
    result_rx: Receiver<VanityResult>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    /// Shared statistics
    stats: Arc<WorkerStats>,
    /// Start time
    start_time: Instant,
}

impl WorkerPool {
    /// Starts `num_workers` threads searching until `target` matches are collected or the
    /// pool is stopped.
    pub fn start(
        pattern: Pattern,
        num_workers: usize,
        target: usize,
        log: Arc<LogBuffer>,
    ) -> Result<Self, PoolError> {
        if num_workers == 0 {
            log.error("thread count must be a positive integer");
            return Err(PoolError::InvalidThreads);
        }
        if target == 0 {
            log.error("wallet count must be a positive integer");
            return Err(PoolError::InvalidTarget);
        }

        let (result_tx, result_rx) = unbounded();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(WorkerStats::new());
        let collector = Arc::new(MatchCollector::new(
            target,
            result_tx,
            stop_flag.clone(),
            log,
        ));

        let handles = Self::spawn_workers(
            num_workers,
            &pattern,
            &collector,
            &stop_flag,
            &stats,
        )?;

        Ok(Self {
            num_workers,
            pattern,
            handles: Some(handles),
            collector,
            result_rx,
            stop_flag,
            stats,
            start_time: Instant::now(),
        })
    }

    /// Spawns worker threads. On failure the already running ones are stopped and joined.
    fn spawn_workers(
        num_workers: usize,
        pattern: &Pattern,
        collector: &Arc<MatchCollector>,
        stop_flag: &Arc<AtomicBool>,
        stats: &Arc<WorkerStats>,
    ) -> Result<Vec<JoinHandle<()>>, PoolError> {
        let mut handles = Vec::with_capacity(num_workers);

        for id in 0..num_workers {
            let worker = CpuWorker::new(
                id,
                pattern.clone(),
                collector.clone(),
                stop_flag.clone(),
                stats.clone(),
            );

            let spawned = thread::Builder::new()
                .name(format!("vanity-worker-{}", id))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    stop_flag.store(true, Ordering::Relaxed);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e.to_string()));
                }
            }
        }

        Ok(handles)
    }

    /// Waits for a result with optional timeout.
    ///
    /// Returns `Some(result)` if a match is found, `None` if timeout expires.
    pub fn wait_for_result(&self, timeout: Duration) -> Option<VanityResult> {
        self.result_rx.recv_timeout(timeout).ok()
    }

    /// Attempts to receive a result without blocking.
    pub fn try_recv(&self) -> Option<VanityResult> {
        self.result_rx.try_recv().ok()
    }

    /// Accepted matches so far, in acceptance order.
    pub fn matches(&self) -> Vec<VanityResult> {
        self.collector.snapshot()
    }

    /// Signals all workers to stop.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Stops the workers, waits for them, and returns the accepted matches.
    pub fn join(mut self) -> Vec<VanityResult> {
        self.stop();
        if let Some(handles) = self.handles.take() {
            for handle in handles {
                let _ = handle.join();
            }
        }
        self.collector.snapshot()
    }

    /// Returns the number of workers.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Returns the pattern being searched for.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns the requested number of matches.
    pub fn target(&self) -> usize {
        self.collector.target
    }

    /// Returns true once the target count has been collected.
    pub fn is_complete(&self) -> bool {
        self.collector.len() >= self.collector.target
    }

    /// Returns true once every worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handles
            .as_ref()
            .map_or(true, |handles| handles.iter().all(JoinHandle::is_finished))
    }

    /// Returns the total keys generated across all workers.
    pub fn total_keys(&self) -> u64 {
        self.stats.total_keys()
    }

    /// Returns the number of accepted matches.
    pub fn total_matches(&self) -> usize {
        self.collector.len()
    }

    /// Returns the number of candidates skipped because generation failed.
    pub fn total_errors(&self) -> u64 {
        self.stats.total_errors()
    }

    /// Returns the elapsed time since the pool was created.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the current generation rate (keys per second).
    pub fn keys_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_keys() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Returns a clone of the stop flag for external use (e.g., signal handlers).
    pub fn stop_flag_clone(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Returns true if the pool has been signaled to stop.
    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
        // Wait for workers to finish if they haven't been joined
        if let Some(handles) = self.handles.take() {
            for handle in handles {
                let _ = handle.join();
            }
        }
    }
}
