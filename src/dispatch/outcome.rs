//! Per-account send results and their classification.

use std::fmt;

use crate::crypto::{Address, KeyError};
use crate::rpc::RpcError;
use crate::tx::FillError;

/// Everything that can go wrong sending one account's transaction.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// Fetching chain id, nonce, gas or fees
    #[error("preparing transaction: {0}")]
    Prepare(#[source] RpcError),

    /// Fee values that cannot be encoded
    #[error("computing fees: {0}")]
    Fee(#[source] FillError),

    #[error("signing transaction: {0}")]
    Sign(#[from] KeyError),

    /// `eth_sendRawTransaction` itself
    #[error("submitting transaction: {0}")]
    Submit(#[source] RpcError),
}

/// Coarse failure taxonomy reported to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The node took the transaction and rejected or reverted it
    Execution,
    /// Network, signing, encoding or other failure before submission
    Generic,
    /// Anything else, reported under its own class name
    Unclassified(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Execution => write!(f, "ExecutionError: {}", self.message),
            FailureKind::Generic => write!(f, "Error: {}", self.message),
            FailureKind::Unclassified(class) => write!(f, "{}: {}", class, self.message),
        }
    }
}

impl From<FillError> for SendError {
    fn from(e: FillError) -> Self {
        match e {
            FillError::Rpc(e) => SendError::Prepare(e),
            e @ FillError::FeeOverflow(_) => SendError::Fee(e),
        }
    }
}

/// A node error that rejects the transaction itself rather than the request.
fn is_execution_rejection(code: i64, message: &str) -> bool {
    let message = message.to_lowercase();
    (code == 3 || (-32099..=-32000).contains(&code))
        && ["revert", "execution", "rejected"]
            .iter()
            .any(|word| message.contains(word))
}

impl SendError {
    pub fn classify(&self) -> SendFailure {
        let (kind, message) = match self {
            SendError::Submit(RpcError::Response { message, .. }) => {
                (FailureKind::Execution, message.clone())
            }
            SendError::Prepare(RpcError::Response { code, message, .. })
                if is_execution_rejection(*code, message) =>
            {
                (FailureKind::Execution, message.clone())
            }
            SendError::Prepare(e @ RpcError::Response { .. }) => (FailureKind::Generic, e.to_string()),
            SendError::Prepare(e) | SendError::Submit(e) if e.is_network() => {
                (FailureKind::Generic, e.to_string())
            }
            SendError::Fee(e) => (FailureKind::Generic, e.to_string()),
            SendError::Sign(e) => (FailureKind::Generic, e.to_string()),
            SendError::Prepare(e) | SendError::Submit(e) => {
                (FailureKind::Unclassified(e.class_name()), e.to_string())
            }
        };
        SendFailure { kind, message }
    }
}

/// Result of one account's send in one cycle.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Position of the account in the configured list
    pub index: usize,
    pub address: Address,
    /// Transaction hash on success
    pub result: Result<String, SendFailure>,
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
