//! Typed wrappers over the handful of `eth_*` methods the dispatcher needs.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::crypto::Address;

use super::jsonrpc::{parse_quantity, to_quantity};
use super::{RpcError, Transport};

#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, RpcError> {
        let value = self.transport.request(method, params).await?;
        parse_quantity(&value)
    }

    async fn quantity_u64(&self, method: &str, params: Value) -> Result<u64, RpcError> {
        let value = self.quantity(method, params).await?;
        u64::try_from(value).map_err(|_| RpcError::Decode(format!("{} out of range: {}", method, value)))
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        self.quantity_u64("eth_chainId", json!([])).await
    }

    /// Next nonce, counting transactions still in the pool.
    pub async fn transaction_count(&self, address: &Address) -> Result<u64, RpcError> {
        self.quantity_u64(
            "eth_getTransactionCount",
            json!([address.to_hex_prefixed(), "pending"]),
        )
        .await
    }

    pub async fn estimate_gas(
        &self,
        from: &Address,
        to: &Address,
        value: u128,
        data: &[u8],
    ) -> Result<u64, RpcError> {
        let call = json!({
            "from": from.to_hex_prefixed(),
            "to": to.to_hex_prefixed(),
            "value": to_quantity(value),
            "data": format!("0x{}", hex::encode(data)),
        });
        self.quantity_u64("eth_estimateGas", json!([call])).await
    }

    pub async fn gas_price(&self) -> Result<u128, RpcError> {
        self.quantity("eth_gasPrice", json!([])).await
    }

    pub async fn max_priority_fee_per_gas(&self) -> Result<u128, RpcError> {
        self.quantity("eth_maxPriorityFeePerGas", json!([])).await
    }

    /// Base fee of the latest block; `None` on chains without EIP-1559.
    pub async fn latest_base_fee(&self) -> Result<Option<u128>, RpcError> {
        let block = self
            .transport
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        match block.get("baseFeePerGas") {
            None | Some(Value::Null) => Ok(None),
            Some(fee) => parse_quantity(fee).map(Some),
        }
    }

    /// Submits a signed transaction and returns its hash.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, RpcError> {
        let value = self
            .transport
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RpcError::Decode(format!("expected transaction hash, got {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockNode;

    #[tokio::test]
    async fn test_typed_calls() {
        let node = Arc::new(MockNode::new());
        let client = RpcClient::new(node.clone());
        let address = Address::from_bytes([7u8; 20]);

        assert_eq!(client.chain_id().await.unwrap(), 1);
        assert_eq!(client.transaction_count(&address).await.unwrap(), 0);
        assert_eq!(
            client.estimate_gas(&address, &address, 0, b"x").await.unwrap(),
            21_000
        );
        assert_eq!(client.latest_base_fee().await.unwrap(), Some(10_000_000_000));
        assert!(client
            .send_raw_transaction(&[0x02, 0xc0])
            .await
            .unwrap()
            .starts_with("0x"));
    }

    #[tokio::test]
    async fn test_legacy_chain_has_no_base_fee() {
        let node = Arc::new(MockNode::new().without_base_fee());
        let client = RpcClient::new(node);
        assert_eq!(client.latest_base_fee().await.unwrap(), None);
    }
}
