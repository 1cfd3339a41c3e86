//! Core data structures for the sweep agent
//!
//! Static network identities, endpoint pairs, fee data and the transient
//! record of a single sweep attempt.
//!
//! Created: 2026-10-16

use alloy::primitives::{utils::format_ether, Address, TxHash, U256};
use serde::Serialize;
use std::fmt;

/// One gwei in wei
pub const GWEI: u128 = 1_000_000_000;

/// Gas units of a plain native-currency transfer
pub const TRANSFER_GAS_UNITS: u64 = 21_000;

/// Floor fee rate used when the network reports no fee-per-unit (5 gwei)
pub const FLOOR_FEE_PER_UNIT: u128 = 5 * GWEI;

/// A supported EVM network.
///
/// Static configuration: name, chain id and the block-explorer host used to
/// build transaction links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NetworkIdentity {
    pub name: &'static str,
    pub chain_id: u64,
    pub explorer: &'static str,
}

impl NetworkIdentity {
    pub const ETHEREUM: NetworkIdentity = NetworkIdentity {
        name: "Ethereum",
        chain_id: 1,
        explorer: "https://etherscan.io",
    };

    pub const BSC: NetworkIdentity = NetworkIdentity {
        name: "BSC",
        chain_id: 56,
        explorer: "https://bscscan.com",
    };

    /// Networks every account is watched on, in endpoint-pair order
    pub const SUPPORTED: [NetworkIdentity; 2] = [Self::ETHEREUM, Self::BSC];

    /// Block-explorer link for a transaction: `https://<host>/tx/<hash>`
    pub fn explorer_link(&self, tx_hash: &TxHash) -> String {
        format!("{}/tx/{}", self.explorer, tx_hash)
    }
}

impl fmt::Display for NetworkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The two endpoint URLs assigned to one account slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPair {
    pub eth_url: String,
    pub bsc_url: String,
}

impl EndpointPair {
    pub fn new(eth_url: impl Into<String>, bsc_url: impl Into<String>) -> Self {
        Self {
            eth_url: eth_url.into(),
            bsc_url: bsc_url.into(),
        }
    }

    /// (endpoint, network) for each supported network
    pub fn endpoints(&self) -> [(&str, NetworkIdentity); 2] {
        [
            (self.eth_url.as_str(), NetworkIdentity::ETHEREUM),
            (self.bsc_url.as_str(), NetworkIdentity::BSC),
        ]
    }
}

/// Raw fee data as reported by the network (all values in wei per gas unit).
/// Any field may be missing on chains that don't report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub gas_price: Option<u128>,
}

/// Fee reserved for one transfer plus the fee parameters it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBudget {
    pub gas_units: u64,
    pub fee_per_unit: u128,
    pub priority_fee_per_unit: u128,
    /// gas_units * fee_per_unit
    pub total: U256,
}

/// A native-currency transfer ready to be signed and broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub chain_id: u64,
}

/// Inclusion result of a submitted transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Final state of one sweep attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Balance does not exceed the fee budget; remembered as ignored
    Dust,
    /// Transfer submitted and confirmed
    Sent { tx_hash: TxHash, explorer_link: String },
    /// Estimation, submission or confirmation failed; retried on the next block
    Failed { reason: String },
}

/// Transient record of one sweep attempt (never persisted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepAttempt {
    pub network: NetworkIdentity,
    pub balance: U256,
    pub fee_budget: Option<FeeBudget>,
    pub amount: Option<U256>,
    pub outcome: SweepOutcome,
}

impl SweepAttempt {
    pub fn is_sent(&self) -> bool {
        matches!(self.outcome, SweepOutcome::Sent { .. })
    }
}

/// Format a wei amount in ether units for human-facing messages
pub fn ether(amount: U256) -> String {
    format_ether(amount)
}
