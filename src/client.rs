//! Chain client boundary.
//!
//! [`ChainClient`] names the capability surface the backend decorates;
//! [`RpcClient`] implements it over an ethers JSON-RPC provider and is where
//! upstream provider errors get classified into typed variants.

use crate::error::{ClientError, ClientResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider, ProviderError};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::time::Duration;

/// Capability surface of an Ethereum JSON-RPC client, as consumed by
/// [`TransactionBackend`](crate::TransactionBackend).
///
/// The first three operations are the ones the backend intercepts; the rest
/// are forwarded unmodified.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Broadcast a transaction and return its hash.
    async fn send_transaction(&self, tx: &TypedTransaction) -> ClientResult<TxHash>;

    /// Next unused nonce for `account` according to the server, including
    /// transactions still in the mempool.
    async fn pending_nonce_at(&self, account: Address) -> ClientResult<u64>;

    /// The node's current gas price suggestion, in wei.
    async fn suggest_gas_price(&self) -> ClientResult<U256>;

    /// Current balance of `account`, in wei.
    async fn balance_at(&self, account: Address) -> ClientResult<U256>;

    /// Latest block number.
    async fn block_number(&self) -> ClientResult<u64>;

    /// Execute a read-only call against the latest state.
    async fn call(&self, tx: &TypedTransaction) -> ClientResult<Bytes>;

    /// Estimate the gas needed to execute `tx`.
    async fn estimate_gas(&self, tx: &TypedTransaction) -> ClientResult<U256>;

    /// Fetch logs matching `filter`.
    async fn get_logs(&self, filter: &Filter) -> ClientResult<Vec<Log>>;

    /// Receipt for a mined transaction, if any.
    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> ClientResult<Option<TransactionReceipt>>;

    /// The chain id the node reports.
    async fn chain_id(&self) -> ClientResult<u64>;
}

/// JSON-RPC chain client backed by an ethers HTTP provider.
pub struct RpcClient {
    provider: Provider<Http>,
}

impl RpcClient {
    /// Connect to an HTTP JSON-RPC endpoint.
    pub fn connect(url: &str) -> ClientResult<Self> {
        let provider = Provider::<Http>::try_from(url)
            .map_err(|e| ClientError::Config(format!("invalid RPC url {}: {}", url, e)))?
            .interval(Duration::from_millis(100));
        Ok(Self { provider })
    }

    /// Wrap an already-constructed provider.
    pub fn from_provider(provider: Provider<Http>) -> Self {
        Self { provider }
    }

    /// The underlying ethers provider.
    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn send_transaction(&self, tx: &TypedTransaction) -> ClientResult<TxHash> {
        let pending = self
            .provider
            .send_transaction(tx.clone(), None)
            .await
            .map_err(to_client_err)?;
        Ok(pending.tx_hash())
    }

    async fn pending_nonce_at(&self, account: Address) -> ClientResult<u64> {
        let nonce = self
            .provider
            .get_transaction_count(account, Some(BlockNumber::Pending.into()))
            .await
            .map_err(to_client_err)?;
        Ok(nonce.as_u64())
    }

    async fn suggest_gas_price(&self) -> ClientResult<U256> {
        self.provider.get_gas_price().await.map_err(to_client_err)
    }

    async fn balance_at(&self, account: Address) -> ClientResult<U256> {
        self.provider
            .get_balance(account, None)
            .await
            .map_err(to_client_err)
    }

    async fn block_number(&self) -> ClientResult<u64> {
        let block = self
            .provider
            .get_block_number()
            .await
            .map_err(to_client_err)?;
        Ok(block.as_u64())
    }

    async fn call(&self, tx: &TypedTransaction) -> ClientResult<Bytes> {
        self.provider.call(tx, None).await.map_err(to_client_err)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> ClientResult<U256> {
        self.provider
            .estimate_gas(tx, None)
            .await
            .map_err(to_client_err)
    }

    async fn get_logs(&self, filter: &Filter) -> ClientResult<Vec<Log>> {
        self.provider.get_logs(filter).await.map_err(to_client_err)
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> ClientResult<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map_err(to_client_err)
    }

    async fn chain_id(&self) -> ClientResult<u64> {
        let id = self.provider.get_chainid().await.map_err(to_client_err)?;
        Ok(id.as_u64())
    }
}

fn to_client_err(err: ProviderError) -> ClientError {
    ClientError::classify(err.to_string())
}
