//! Batch transaction dispatch.
//!
//! - `dispatcher`: one cycle of concurrent sends, one per account
//! - `scheduler`: repeats cycles on a fixed delay until stopped
//! - `outcome`: per-account results and failure classification

mod dispatcher;
mod outcome;
mod scheduler;

pub use dispatcher::Dispatcher;
pub use outcome::{FailureKind, SendError, SendFailure, SendOutcome};
pub use scheduler::{Scheduler, SchedulerState, StartError};
