//! Chain Access Module
//!
//! The I/O boundary between the sweep engine and a live EVM network.
//! `ChainConnector` opens a connection (client + block stream) for one
//! endpoint; `ChainClient` performs the reads and writes a sweep needs.
//!
//! Created: 2026-10-16
//!
//! Architecture:
//!     mod.rs         : ChainClient / ChainConnector traits, Connection
//!     alloy_client.rs: WebSocket implementation on alloy providers
//!     testing.rs     : in-memory fakes (test builds only)

pub mod alloy_client;
#[cfg(test)]
pub mod testing;

pub use alloy_client::{AlloyClient, AlloyConnector};

use crate::error::SweepResult;
use crate::types::{Confirmation, FeeData, NetworkIdentity, TransferRequest};
use alloy::primitives::{Address, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Reads and writes one sweep needs against a single network
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native balance of `address` at the latest block
    async fn balance_of(&self, address: Address) -> SweepResult<U256>;

    /// Current suggested fee data. Individual fields may be missing;
    /// an error means no fee information could be read at all.
    async fn fee_data(&self) -> SweepResult<FeeData>;

    /// Sign and broadcast a transfer, returning its hash once accepted
    async fn submit_transfer(&self, request: TransferRequest) -> SweepResult<TxHash>;

    /// Wait (without timeout) until the transfer is included
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> SweepResult<Confirmation>;
}

/// A live connection: client handle plus the stream of new block heights
pub struct Connection {
    pub client: Arc<dyn ChainClient>,
    pub blocks: BoxStream<'static, u64>,
}

/// Opens connections to network endpoints
#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &str,
        network: NetworkIdentity,
        signer: &PrivateKeySigner,
    ) -> SweepResult<Connection>;
}
