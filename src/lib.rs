//! Reliability layer over an Ethereum JSON-RPC client.
//!
//! [`TransactionBackend`] wraps a chain client and intercepts three
//! operations: gas price suggestions (cached, marked up, capped at a
//! configurable ceiling), pending nonce queries (reconciled against local
//! tracking, with drift recovery), and transaction sends (nonce bookkeeping
//! on success and on replacement collisions). Everything else is forwarded
//! to the wrapped client unchanged, so the backend works as a drop-in
//! replacement for transaction-submitting callers.
//!
//! The backend is not safe for concurrent use: create one instance per
//! signing account and serialize calls to it. Cancellation works the usual
//! async way, by dropping the in-flight future.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;

pub use backend::TransactionBackend;
pub use client::{ChainClient, RpcClient};
pub use config::BackendConfig;
pub use error::{ClientError, ClientResult};
