//! Alloy WebSocket Chain Client
//!
//! One WS provider per (account, network). The provider carries the
//! account's wallet so `send_transaction` signs locally; gas limit, fees
//! and chain id are always set explicitly on the request.
//!
//! Created: 2026-10-16
//!
//! Notes:
//!     - Block heights come from `subscribe_blocks()` (newHeads)
//!     - Fee data combines `estimate_eip1559_fees` and `eth_gasPrice`;
//!       either may fail independently (legacy-only chains, flaky nodes)

use super::{ChainClient, ChainConnector, Connection};
use crate::error::{SweepError, SweepResult};
use crate::types::{Confirmation, FeeData, NetworkIdentity, TransferRequest};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// ChainClient backed by an alloy WS provider
pub struct AlloyClient {
    provider: DynProvider,
    network: NetworkIdentity,
}

impl AlloyClient {
    pub fn new(provider: DynProvider, network: NetworkIdentity) -> Self {
        Self { provider, network }
    }
}

#[async_trait]
impl ChainClient for AlloyClient {
    async fn balance_of(&self, address: Address) -> SweepResult<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| SweepError::Query(format!("{} getBalance: {}", self.network, e)))
    }

    async fn fee_data(&self) -> SweepResult<FeeData> {
        let (eip1559, gas_price) = tokio::join!(
            async { self.provider.estimate_eip1559_fees().await },
            async { self.provider.get_gas_price().await }
        );

        if let (Err(e1), Err(e2)) = (&eip1559, &gas_price) {
            return Err(SweepError::Estimation(format!(
                "{}: eip1559 estimate: {} | gasPrice: {}",
                self.network, e1, e2
            )));
        }

        let (max_fee_per_gas, max_priority_fee_per_gas) = match eip1559 {
            Ok(est) => (Some(est.max_fee_per_gas), Some(est.max_priority_fee_per_gas)),
            Err(e) => {
                debug!("{} EIP-1559 fee estimate unavailable: {}", self.network, e);
                (None, None)
            }
        };

        Ok(FeeData {
            max_fee_per_gas,
            max_priority_fee_per_gas,
            gas_price: gas_price.ok(),
        })
    }

    async fn submit_transfer(&self, request: TransferRequest) -> SweepResult<TxHash> {
        let tx = TransactionRequest::default()
            .with_to(request.to)
            .with_value(request.value)
            .with_gas_limit(request.gas_limit)
            .with_max_fee_per_gas(request.max_fee_per_gas)
            .with_max_priority_fee_per_gas(request.max_priority_fee_per_gas)
            .with_chain_id(request.chain_id);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| SweepError::Submission(e.to_string()))?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> SweepResult<Confirmation> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| SweepError::Confirmation(e.to_string()))?;

        if !receipt.status() {
            return Err(SweepError::Confirmation(format!("transaction {} reverted", tx_hash)));
        }

        Ok(Confirmation {
            tx_hash,
            block_number: receipt.block_number,
        })
    }
}

/// Connects alloy WS providers and subscribes to new blocks
#[derive(Debug, Default, Clone, Copy)]
pub struct AlloyConnector;

#[async_trait]
impl ChainConnector for AlloyConnector {
    async fn connect(
        &self,
        endpoint: &str,
        network: NetworkIdentity,
        signer: &PrivateKeySigner,
    ) -> SweepResult<Connection> {
        let wallet = EthereumWallet::from(signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_ws(WsConnect::new(endpoint))
            .await
            .map_err(|e| SweepError::connection(network.name, e))?
            .erased();

        let subscription = provider
            .subscribe_blocks()
            .await
            .map_err(|e| SweepError::connection(network.name, e))?;

        info!("{} WS block subscription active", network);

        let blocks = subscription
            .into_stream()
            .map(|header| header.number)
            .boxed();

        Ok(Connection {
            client: Arc::new(AlloyClient::new(provider, network)),
            blocks,
        })
    }
}
