//! In-memory chain fakes for unit tests
//!
//! `MockChain` answers balance / fee queries from scripted values and
//! records every submitted transfer, debiting the scripted balance.
//! `MockConnector` hands out MockChains keyed by endpoint, with block
//! streams fed from test code.

use super::{ChainClient, ChainConnector, Connection};
use crate::error::{SweepError, SweepResult};
use crate::types::{Confirmation, FeeData, NetworkIdentity, TransferRequest};
use alloy::primitives::{Address, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::ReceiverStream;

#[derive(Default)]
pub struct MockChain {
    pub balance: Mutex<U256>,
    pub balance_fails: Mutex<bool>,
    pub fee_data: Mutex<FeeData>,
    pub fee_fails: Mutex<bool>,
    pub submit_error: Mutex<Option<String>>,
    pub confirm_error: Mutex<Option<String>>,
    /// When set, confirmation waits for a notification on this gate
    pub confirm_gate: Mutex<Option<Arc<Notify>>>,
    /// When set, fee queries wait for a notification on this gate
    pub fee_gate: Mutex<Option<Arc<Notify>>>,
    pub submitted: Mutex<Vec<TransferRequest>>,
    pub fee_queries: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_balance(balance: U256) -> Arc<Self> {
        let chain = Self::new();
        chain.set_balance(balance);
        chain
    }

    pub fn set_balance(&self, balance: U256) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn set_fee_data(&self, data: FeeData) {
        *self.fee_data.lock().unwrap() = data;
    }

    pub fn fail_fee_queries(&self, fail: bool) {
        *self.fee_fails.lock().unwrap() = fail;
    }

    pub fn fail_balance_queries(&self, fail: bool) {
        *self.balance_fails.lock().unwrap() = fail;
    }

    pub fn fail_submissions(&self, reason: Option<&str>) {
        *self.submit_error.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn fail_confirmations(&self, reason: Option<&str>) {
        *self.confirm_error.lock().unwrap() = reason.map(str::to_string);
    }

    /// Hold every confirmation until the returned gate is notified
    pub fn gate_confirmations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.confirm_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold every fee query until the returned gate is notified
    pub fn gate_fee_queries(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.fee_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn submitted(&self) -> Vec<TransferRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn balance_of(&self, _address: Address) -> SweepResult<U256> {
        if *self.balance_fails.lock().unwrap() {
            return Err(SweepError::Query("mock balance failure".into()));
        }
        Ok(*self.balance.lock().unwrap())
    }

    async fn fee_data(&self) -> SweepResult<FeeData> {
        self.fee_queries.fetch_add(1, Ordering::SeqCst);
        let gate = self.fee_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if *self.fee_fails.lock().unwrap() {
            return Err(SweepError::Estimation("mock fee failure".into()));
        }
        Ok(*self.fee_data.lock().unwrap())
    }

    async fn submit_transfer(&self, request: TransferRequest) -> SweepResult<TxHash> {
        if let Some(reason) = self.submit_error.lock().unwrap().clone() {
            return Err(SweepError::Submission(reason));
        }
        // Debit value plus the full fee allowance, like a mined transfer would
        {
            let mut balance = self.balance.lock().unwrap();
            let cost = request.value
                + U256::from(request.gas_limit) * U256::from(request.max_fee_per_gas);
            *balance = balance.saturating_sub(cost);
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request);
        Ok(TxHash::with_last_byte(submitted.len() as u8))
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> SweepResult<Confirmation> {
        let gate = self.confirm_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(reason) = self.confirm_error.lock().unwrap().clone() {
            return Err(SweepError::Confirmation(reason));
        }
        Ok(Confirmation {
            tx_hash,
            block_number: Some(1),
        })
    }
}

/// Connector handing out MockChains; endpoints listed in `failing` refuse to connect
#[derive(Default)]
pub struct MockConnector {
    chains: Mutex<HashMap<String, Arc<MockChain>>>,
    senders: Mutex<HashMap<String, mpsc::Sender<u64>>>,
    failing: Mutex<HashSet<String>>,
    pub connects: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_endpoint(&self, endpoint: &str) {
        self.failing.lock().unwrap().insert(endpoint.to_string());
    }

    /// Chain served for `endpoint` (created on first use)
    pub fn chain(&self, endpoint: &str) -> Arc<MockChain> {
        self.chains
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_insert_with(MockChain::new)
            .clone()
    }

    /// Deliver a new block height to the latest connection on `endpoint`
    pub async fn push_block(&self, endpoint: &str, height: u64) {
        let sender = self.senders.lock().unwrap().get(endpoint).cloned();
        if let Some(sender) = sender {
            let _ = sender.send(height).await;
        }
    }

    /// End the block stream of `endpoint`, simulating a dropped connection
    pub fn drop_connection(&self, endpoint: &str) {
        self.senders.lock().unwrap().remove(endpoint);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainConnector for MockConnector {
    async fn connect(
        &self,
        endpoint: &str,
        network: NetworkIdentity,
        _signer: &PrivateKeySigner,
    ) -> SweepResult<Connection> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(endpoint) {
            return Err(SweepError::connection(network.name, "mock refused"));
        }

        let (tx, rx) = mpsc::channel(16);
        self.senders.lock().unwrap().insert(endpoint.to_string(), tx);

        Ok(Connection {
            client: self.chain(endpoint),
            blocks: ReceiverStream::new(rx).boxed(),
        })
    }
}

/// Deterministic test keys (anvil accounts #0 and #1)
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_KEY_2: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub fn test_signer() -> PrivateKeySigner {
    TEST_KEY.parse().unwrap()
}
