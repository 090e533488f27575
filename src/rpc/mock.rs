//! In-memory node used by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::crypto::{keccak256, Address};

use super::{RpcError, Transport};

/// How the node misbehaves for one sender.
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    /// `eth_estimateGas` reverts
    Revert,
    /// `eth_getTransactionCount` loses the connection
    Network,
    /// `eth_getTransactionCount` returns garbage
    Garbage,
}

#[derive(Default)]
pub struct MockNode {
    base_fee: Option<u128>,
    submit_delay: Duration,
    reject_submissions: Option<String>,
    failures: HashMap<String, MockFailure>,
    submitted: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockNode {
    pub fn new() -> Self {
        Self {
            base_fee: Some(10_000_000_000),
            ..Self::default()
        }
    }

    pub fn without_base_fee(mut self) -> Self {
        self.base_fee = None;
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn rejecting_submissions(mut self, message: &str) -> Self {
        self.reject_submissions = Some(message.to_string());
        self
    }

    pub fn failing(mut self, address: &Address, failure: MockFailure) -> Self {
        self.failures.insert(address.to_hex_prefixed(), failure);
        self
    }

    /// Raw transactions accepted so far, as `0x` hex.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn failure_for(&self, value: &Value) -> Option<MockFailure> {
        value
            .as_str()
            .and_then(|address| self.failures.get(&address.to_lowercase()))
            .copied()
    }

    async fn submit(&self, raw: &str) -> Result<Value, RpcError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = &self.reject_submissions {
            return Err(RpcError::Response {
                code: -32000,
                message: message.clone(),
                data: None,
            });
        }

        let bytes = hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        self.submitted.lock().unwrap().push(raw.to_string());
        Ok(json!(format!("0x{}", hex::encode(keccak256(&bytes)))))
    }
}

#[async_trait]
impl Transport for MockNode {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "eth_chainId" => Ok(json!("0x1")),
            "eth_getTransactionCount" => match self.failure_for(&params[0]) {
                Some(MockFailure::Network) => Err(RpcError::Closed),
                Some(MockFailure::Garbage) => Ok(json!(42)),
                _ => Ok(json!("0x0")),
            },
            "eth_estimateGas" => match self.failure_for(&params[0]["from"]) {
                Some(MockFailure::Revert) => Err(RpcError::Response {
                    code: 3,
                    message: "execution reverted: already minted".into(),
                    data: Some(json!("0x")),
                }),
                _ => Ok(json!("0x5208")),
            },
            "eth_gasPrice" => Ok(json!("0x3b9aca00")),
            "eth_maxPriorityFeePerGas" => Ok(json!("0x59682f00")),
            "eth_getBlockByNumber" => Ok(match self.base_fee {
                Some(fee) => json!({ "number": "0x10", "baseFeePerGas": format!("{:#x}", fee) }),
                None => json!({ "number": "0x10" }),
            }),
            "eth_sendRawTransaction" => {
                let raw = params[0].as_str().unwrap_or_default().to_string();
                self.submit(&raw).await
            }
            other => Err(RpcError::Response {
                code: -32601,
                message: format!("the method {} does not exist/is not available", other),
                data: None,
            }),
        }
    }
}
