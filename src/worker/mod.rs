//! Worker pool for parallel vanity address generation.
//!
//! - `cpu`: a single search thread and the shared counters
//! - `pool`: starts the threads, collects matches up to the requested count

mod cpu;
mod pool;

pub use cpu::WorkerStats;
pub use pool::{PoolError, VanityResult, WorkerPool};
