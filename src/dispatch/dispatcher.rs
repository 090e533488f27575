//! One cycle of concurrent per-account sends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::OnceCell;

use crate::crypto::Account;
use crate::log_buffer::LogBuffer;
use crate::rpc::{RpcClient, RpcError};
use crate::tx::{self, TransactionBuilder};

use super::outcome::{SendError, SendOutcome};

/// Sends one transaction per account per cycle and reports every outcome.
pub struct Dispatcher {
    client: RpcClient,
    accounts: Vec<Account>,
    builder: TransactionBuilder,
    chain_id: OnceCell<u64>,
    log: Arc<LogBuffer>,
    successes: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        client: RpcClient,
        accounts: Vec<Account>,
        builder: TransactionBuilder,
        log: Arc<LogBuffer>,
    ) -> Self {
        Self {
            client,
            accounts,
            builder,
            chain_id: OnceCell::new(),
            log,
            successes: AtomicU64::new(0),
        }
    }

    /// Pins the chain id instead of asking the node on first use.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = OnceCell::new_with(Some(chain_id));
        self
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn log(&self) -> &Arc<LogBuffer> {
        &self.log
    }

    /// Successful sends across all cycles so far.
    pub fn success_count(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    /// Issues every account's send at once and waits for all of them.
    ///
    /// A failing account never cancels the others. Outcomes come back in account order,
    /// one per account, and each is logged exactly once.
    pub async fn run_cycle(&self) -> Vec<SendOutcome> {
        let results = join_all(self.accounts.iter().map(|account| self.send(account))).await;

        let outcomes: Vec<SendOutcome> = results
            .into_iter()
            .zip(&self.accounts)
            .enumerate()
            .map(|(index, (result, account))| SendOutcome {
                index,
                address: *account.address(),
                result: result.map_err(|e| {
                    log::debug!("send from {} failed: {}", account.address(), e);
                    e.classify()
                }),
            })
            .collect();

        for outcome in &outcomes {
            self.report(outcome);
        }

        outcomes
    }

    async fn send(&self, account: &Account) -> Result<String, SendError> {
        let chain_id = self.chain_id().await.map_err(SendError::Prepare)?;
        let intent = self.builder.build(account);
        let unsigned = tx::fill(&self.client, &intent, chain_id).await?;
        let raw = unsigned.sign(account)?;

        self.client
            .send_raw_transaction(&raw)
            .await
            .map_err(SendError::Submit)
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.chain_id
            .get_or_try_init(|| self.client.chain_id())
            .await
            .copied()
    }

    fn report(&self, outcome: &SendOutcome) {
        let address = outcome.address.short();
        match &outcome.result {
            Ok(hash) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                self.log.success(format!("{} {}", address, hash));
            }
            Err(failure) => self.log.error(format!("{} {}", address, failure)),
        }
    }
}
