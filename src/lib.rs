//! # inscribe
//!
//! Batch EVM transaction broadcaster and multi-threaded vanity address generator.
//!
//! ## Architecture
//!
//! - `crypto`: Private keys, accounts, address derivation and checksums
//! - `tx`: Transaction intents, fee modes, node-filled envelopes and signing
//! - `rpc`: JSON-RPC over HTTP or WebSocket
//! - `dispatch`: Concurrent per-account sends and the repeating scheduler
//! - `matcher`: Vanity pattern compilation and matching
//! - `worker`: Parallel search threads and the result pool
//! - `log_buffer`: Bounded, newest-first event log
//! - `config`: Command line configuration

pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod log_buffer;
pub mod matcher;
pub mod rpc;
pub mod tx;
pub mod worker;

pub use config::{Config, MintPlan, Plan, VanitySearch};
pub use crypto::{Account, Address, PrivateKey};
pub use dispatch::{Dispatcher, Scheduler, SchedulerState, SendOutcome};
pub use log_buffer::LogBuffer;
pub use matcher::{MatchResult, Pattern, PatternType};
pub use rpc::RpcClient;
pub use tx::{FeeMode, TransactionBuilder};
pub use worker::{VanityResult, WorkerPool};
