//! Fee Estimator
//!
//! Fixed-shape fee budget for a plain native transfer:
//! budget = 21000 gas * fee-per-unit, where fee-per-unit is the suggested
//! EIP-1559 max fee, else the legacy gas price, else a 5 gwei floor.
//! No dynamic gas estimation: only valid for value transfers to an EOA.

use crate::chain::ChainClient;
use crate::error::SweepResult;
use crate::types::{FeeBudget, FeeData, FLOOR_FEE_PER_UNIT, TRANSFER_GAS_UNITS};
use alloy::primitives::U256;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct FeeEstimator {
    gas_units: u64,
    floor_fee_per_unit: u128,
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new(TRANSFER_GAS_UNITS, FLOOR_FEE_PER_UNIT)
    }
}

impl FeeEstimator {
    pub fn new(gas_units: u64, floor_fee_per_unit: u128) -> Self {
        Self {
            gas_units,
            floor_fee_per_unit,
        }
    }

    /// Query the network's fee data and derive the budget
    pub async fn estimate(&self, client: &dyn ChainClient) -> SweepResult<FeeBudget> {
        let data = client.fee_data().await?;
        let budget = self.budget_from(data);
        debug!(
            "Fee budget: {} gas x {} wei = {} wei (priority {})",
            budget.gas_units, budget.fee_per_unit, budget.total, budget.priority_fee_per_unit
        );
        Ok(budget)
    }

    /// Pure derivation from already-fetched fee data
    pub fn budget_from(&self, data: FeeData) -> FeeBudget {
        let fee_per_unit = data
            .max_fee_per_gas
            .filter(|fee| *fee > 0)
            .or(data.gas_price.filter(|price| *price > 0))
            .unwrap_or(self.floor_fee_per_unit);

        // A zero or missing tip falls back to the full fee rate
        let priority_fee_per_unit = data
            .max_priority_fee_per_gas
            .filter(|tip| *tip > 0)
            .unwrap_or(fee_per_unit);

        FeeBudget {
            gas_units: self.gas_units,
            fee_per_unit,
            priority_fee_per_unit,
            total: U256::from(self.gas_units) * U256::from(fee_per_unit),
        }
    }
}
