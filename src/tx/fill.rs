//! Completes an intent with node-sourced nonce, gas limit and fees.

use crate::rpc::{RpcClient, RpcError};

use super::builder::{FeeMode, TransactionIntent};
use super::envelope::UnsignedTx;

#[derive(Debug, thiserror::Error)]
pub enum FillError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// A computed fee does not fit in u128 wei
    #[error("{0} overflows")]
    FeeOverflow(&'static str),
}

/// Fills the fields an intent leaves to the node.
///
/// - `FlatPrice` always produces a legacy transaction at that price.
/// - Otherwise, chains reporting a base fee get an EIP-1559 transaction with
///   `maxFeePerGas = baseFee * 1.2 + tip`, where the tip is the override or the node's
///   suggestion. Chains without a base fee fall back to legacy at `eth_gasPrice` (plus tip).
pub async fn fill(
    client: &RpcClient,
    intent: &TransactionIntent,
    chain_id: u64,
) -> Result<UnsignedTx, FillError> {
    let (nonce, gas_limit) = tokio::try_join!(
        client.transaction_count(&intent.from),
        client.estimate_gas(&intent.from, &intent.to, intent.value, &intent.data),
    )?;

    let tx = match intent.fee {
        FeeMode::FlatPrice(gas_price) => legacy(intent, chain_id, nonce, gas_limit, gas_price),
        fee => match client.latest_base_fee().await? {
            Some(base_fee) => {
                let tip = match fee.priority_fee() {
                    Some(tip) => tip,
                    None => client.max_priority_fee_per_gas().await?,
                };
                let max_fee_per_gas = base_fee
                    .checked_mul(12)
                    .map(|fee| fee / 10)
                    .and_then(|fee| fee.checked_add(tip))
                    .ok_or(FillError::FeeOverflow("maxFeePerGas"))?;
                UnsignedTx::Eip1559 {
                    chain_id,
                    nonce,
                    max_priority_fee_per_gas: tip,
                    max_fee_per_gas,
                    gas_limit,
                    to: intent.to,
                    value: intent.value,
                    data: intent.data.clone(),
                }
            }
            None => {
                let gas_price = client
                    .gas_price()
                    .await?
                    .checked_add(fee.priority_fee().unwrap_or(0))
                    .ok_or(FillError::FeeOverflow("gasPrice"))?;
                legacy(intent, chain_id, nonce, gas_limit, gas_price)
            }
        },
    };

    Ok(tx)
}

fn legacy(
    intent: &TransactionIntent,
    chain_id: u64,
    nonce: u64,
    gas_limit: u64,
    gas_price: u128,
) -> UnsignedTx {
    UnsignedTx::Legacy {
        chain_id,
        nonce,
        gas_price,
        gas_limit,
        to: intent.to,
        value: intent.value,
        data: intent.data.clone(),
    }
}
