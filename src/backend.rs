//! Transaction backend wrapping a chain client. This is useful for layering
//! extra reliability on top of plain RPC:
//!
//! - Gas price suggestions are cached, marked up, and capped at a ceiling
//! - Pending nonce queries are reconciled against a locally tracked nonce
//! - Sends feed nonce bookkeeping on success and on replacement collisions
//!
//! Not safe for concurrent use: one instance per signing account, and the
//! intercepted operations take `&mut self`.

use crate::client::ChainClient;
use crate::config::BackendConfig;
use crate::error::ClientResult;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Filter, Log, TransactionReceipt, TxHash, U256};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Stateful decorator over a [`ChainClient`].
///
/// Intercepts gas price suggestions, pending nonce queries, and sends;
/// forwards everything else to the wrapped client unchanged.
pub struct TransactionBackend<C> {
    client: C,
    config: BackendConfig,

    local_nonce: u64,
    last_server_nonce: u64,

    gas_price: Option<U256>,
    gas_price_updated: Option<Instant>,
    max_gas_price: Option<U256>,
}

impl<C: ChainClient> TransactionBackend<C> {
    /// Create a new backend with default tuning and an optional gas price
    /// ceiling in wei.
    pub fn new(client: C, max_gas_price: Option<U256>) -> Self {
        let mut backend = Self::with_config(client, BackendConfig::default());
        backend.max_gas_price = max_gas_price;
        backend
    }

    /// Create a new backend with explicit tuning.
    pub fn with_config(client: C, config: BackendConfig) -> Self {
        let max_gas_price = config.max_gas_price_wei();
        Self {
            client,
            config,
            local_nonce: 0,
            last_server_nonce: 0,
            gas_price: None,
            gas_price_updated: None,
            max_gas_price,
        }
    }

    /// Retrieve the currently suggested gas price, marked up by the
    /// configured percentage.
    ///
    /// Suggestions are cached; a ceiling breach returns the ceiling instead
    /// of the suggestion and is never cached.
    pub async fn suggest_gas_price(&mut self) -> ClientResult<U256> {
        if let (Some(price), Some(updated)) = (self.gas_price, self.gas_price_updated) {
            if updated.elapsed() < Duration::from_secs(self.config.gas_price_ttl_secs) {
                return Ok(price);
            }
        }

        let base = self.client.suggest_gas_price().await?;
        let buffer = base * self.config.gas_markup_percent / 100;
        let suggested = base + buffer;

        if let Some(max) = self.max_gas_price {
            if suggested > max {
                warn!(
                    "suggested gas price {} exceeds maximum {}, returning maximum",
                    suggested, max
                );
                return Ok(max);
            }
        }

        debug!("returning gas price {}", suggested);
        self.gas_price = Some(suggested);
        self.gas_price_updated = Some(Instant::now());
        Ok(suggested)
    }

    /// Next nonce to use for `account`, reconciling the server's view with
    /// local tracking.
    ///
    /// The server may lag behind locally-issued sends, so local tracking
    /// wins while it stays within `max_nonce_drift` of the server. Beyond
    /// that the local nonce is assumed stale and pulled down to the server's
    /// value.
    pub async fn pending_nonce_at(&mut self, account: Address) -> ClientResult<u64> {
        let server_nonce = match self.client.pending_nonce_at(account).await {
            Ok(nonce) => nonce,
            Err(err) => {
                error!("failed to get pending nonce for {:?}: {}", account, err);
                return Err(err);
            }
        };
        self.last_server_nonce = server_nonce;

        if self.local_nonce == 0 {
            debug!(
                "using server nonce {} for {:?} (first observation)",
                server_nonce, account
            );
            self.local_nonce = server_nonce;
            return Ok(server_nonce);
        }

        if self.local_nonce > server_nonce
            && self.local_nonce - server_nonce >= self.config.max_nonce_drift
        {
            warn!(
                "local nonce {} drifted past server nonce {}, resetting",
                self.local_nonce, server_nonce
            );
            self.reset_nonce();
            return Ok(server_nonce);
        }

        debug!(
            "using local nonce {} for {:?} (server at {})",
            self.local_nonce, account, server_nonce
        );
        Ok(self.local_nonce)
    }

    /// Send a transaction and account for its nonce locally.
    ///
    /// A successful send advances the local nonce past the transaction's. A
    /// replacement-underpriced failure means the tracked nonce collided with
    /// a pending transaction, so local tracking snaps back to the last known
    /// server nonce before the error is propagated.
    pub async fn send_transaction(&mut self, tx: &TypedTransaction) -> ClientResult<TxHash> {
        debug!(
            "sending transaction to {:?} nonce {:?} gas {:?} gas_price {:?} sighash {:?}",
            tx.to(),
            tx.nonce(),
            tx.gas(),
            tx.gas_price(),
            tx.sighash()
        );
        match self.client.send_transaction(tx).await {
            Ok(hash) => {
                info!("transaction sent: {:?}", hash);
                self.advance_nonce(tx);
                Ok(hash)
            }
            Err(err) => {
                if err.is_replacement_underpriced() {
                    self.reset_nonce();
                }
                error!("failed to send transaction: {}", err);
                Err(err)
            }
        }
    }

    fn advance_nonce(&mut self, tx: &TypedTransaction) {
        if let Some(nonce) = tx.nonce() {
            let next = nonce.as_u64() + 1;
            if next > self.local_nonce {
                self.local_nonce = next;
            }
        }
    }

    // Only ever pulls the local nonce down toward the server's value.
    fn reset_nonce(&mut self) {
        if self.last_server_nonce < self.local_nonce {
            self.local_nonce = self.last_server_nonce;
        }
    }

    /// Current balance of `account`, in wei.
    pub async fn balance_at(&self, account: Address) -> ClientResult<U256> {
        self.client.balance_at(account).await
    }

    /// Latest block number.
    pub async fn block_number(&self) -> ClientResult<u64> {
        self.client.block_number().await
    }

    /// Execute a read-only call against the latest state.
    pub async fn call(&self, tx: &TypedTransaction) -> ClientResult<Bytes> {
        self.client.call(tx).await
    }

    /// Estimate the gas needed to execute `tx`.
    pub async fn estimate_gas(&self, tx: &TypedTransaction) -> ClientResult<U256> {
        self.client.estimate_gas(tx).await
    }

    /// Fetch logs matching `filter`.
    pub async fn get_logs(&self, filter: &Filter) -> ClientResult<Vec<Log>> {
        self.client.get_logs(filter).await
    }

    /// Receipt for a mined transaction, if any.
    pub async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> ClientResult<Option<TransactionReceipt>> {
        self.client.transaction_receipt(hash).await
    }

    /// The chain id the node reports.
    pub async fn chain_id(&self) -> ClientResult<u64> {
        self.client.chain_id().await
    }

    /// The wrapped client, for operations the backend does not intercept.
    pub fn client(&self) -> &C {
        &self.client
    }
}
