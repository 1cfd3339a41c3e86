//! Sweep Engine
//!
//! Decides whether an observed balance is worth sweeping and drives the
//! transfer lifecycle: ignore check → lock → fee estimate → dust or send →
//! confirm → release. The lock is held from before estimation until the
//! attempt ends, and the balance is re-read under it so a stale observation
//! never resends funds already swept. Failed attempts leave the balance
//! eligible so the next block retries; there is no other backoff.
//!
//! Created: 2026-10-16
//!
//! Flow per session:
//!     Connected → (balance>0, not ignored, not locked) → Estimating
//!     Estimating → (dust) → Connected [balance ignored]
//!     Estimating → (sufficient) → Sending → Confirming → Connected
//!     Sending/Confirming → (error) → Connected [lock released, not ignored]

use super::fees::FeeEstimator;
use super::guard::SessionState;
use crate::chain::ChainClient;
use crate::error::SweepResult;
use crate::notify::{OutcomeKind, OutcomeRecord, OutcomeSink};
use crate::session::BlockHandler;
use crate::types::{
    ether, Confirmation, FeeBudget, NetworkIdentity, SweepAttempt, SweepOutcome, TransferRequest,
};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything the engine needs to know about one (account, network) session
#[derive(Clone)]
pub struct SweepContext {
    pub account_index: usize,
    pub address: Address,
    pub network: NetworkIdentity,
    pub client: Arc<dyn ChainClient>,
    pub state: Arc<SessionState>,
}

impl SweepContext {
    /// Prefix used in every human-facing message
    pub fn label(&self) -> String {
        format!("[Account {}][{}]", self.account_index, self.network)
    }

    /// Best-effort balance read: a failed query counts as zero so the
    /// watch loop never stops on a transient read error.
    pub async fn balance_of(&self, address: Address) -> U256 {
        match self.client.balance_of(address).await {
            Ok(balance) => balance,
            Err(e) => {
                debug!("{} balance query failed (treated as zero): {}", self.label(), e);
                U256::ZERO
            }
        }
    }

    /// Best-effort balance of the session's own account
    pub async fn observed_balance(&self) -> U256 {
        self.balance_of(self.address).await
    }
}

pub struct SweepEngine {
    destination: Address,
    estimator: FeeEstimator,
    sink: Arc<dyn OutcomeSink>,
}

impl SweepEngine {
    pub fn new(destination: Address, sink: Arc<dyn OutcomeSink>) -> Self {
        Self::with_estimator(destination, FeeEstimator::default(), sink)
    }

    pub fn with_estimator(
        destination: Address,
        estimator: FeeEstimator,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            destination,
            estimator,
            sink,
        }
    }

    pub fn destination(&self) -> Address {
        self.destination
    }

    fn report(&self, kind: OutcomeKind, message: String) {
        self.sink.report(OutcomeRecord::new(kind, message));
    }

    /// Process one observed balance for a session.
    ///
    /// Returns None when the observation is a no-op (zero balance, already
    /// ignored, a sweep in flight, or the balance changed since it was
    /// observed), otherwise the attempt record.
    pub async fn on_balance_observed(
        &self,
        ctx: &SweepContext,
        balance: U256,
    ) -> Option<SweepAttempt> {
        if balance.is_zero() {
            return None;
        }
        if ctx.state.ignored.is_ignored(&balance) {
            return None;
        }

        // Held through estimation, submission and confirmation; released on drop
        let Some(_guard) = ctx.state.lock.try_lock() else {
            return None;
        };

        let label = ctx.label();

        // The observation may predate a sweep that completed while it was queued
        let current = ctx.observed_balance().await;
        if current != balance {
            debug!(
                "{} stale observation ({} now {}), skipping",
                label,
                ether(balance),
                ether(current)
            );
            return None;
        }

        let started = Instant::now();
        self.report(
            OutcomeKind::BalanceDetected,
            format!("💰 {} New balance: {}", label, ether(balance)),
        );

        let attempt = |fee_budget: Option<FeeBudget>, amount: Option<U256>, outcome| SweepAttempt {
            network: ctx.network,
            balance,
            fee_budget,
            amount,
            outcome,
        };

        let budget = match self.estimator.estimate(ctx.client.as_ref()).await {
            Ok(budget) => budget,
            Err(e) => {
                self.report(OutcomeKind::SweepFailed, format!("❌ {} Error: {}", label, e));
                return Some(attempt(None, None, SweepOutcome::Failed { reason: e.to_string() }));
            }
        };

        if balance <= budget.total {
            ctx.state.ignored.mark_ignored(balance);
            self.report(
                OutcomeKind::DustSkipped,
                format!(
                    "⚠️ {} Amount too small: {} (fee budget {})",
                    label,
                    ether(balance),
                    ether(budget.total)
                ),
            );
            return Some(attempt(Some(budget), None, SweepOutcome::Dust));
        }

        let amount = balance - budget.total;

        let request = TransferRequest {
            to: self.destination,
            value: amount,
            gas_limit: budget.gas_units,
            max_fee_per_gas: budget.fee_per_unit,
            max_priority_fee_per_gas: budget.priority_fee_per_unit,
            chain_id: ctx.network.chain_id,
        };

        let outcome = match self.send_and_confirm(ctx, request, started).await {
            Ok(confirmation) => {
                let explorer_link = ctx.network.explorer_link(&confirmation.tx_hash);
                self.report(
                    OutcomeKind::Confirmed,
                    format!("✅ {} Done! {}\n{}", label, ether(amount), explorer_link),
                );
                SweepOutcome::Sent {
                    tx_hash: confirmation.tx_hash,
                    explorer_link,
                }
            }
            Err(e) => {
                warn!("{} sweep failed, will retry on next block: {}", label, e);
                self.report(OutcomeKind::SweepFailed, format!("❌ {} Error: {}", label, e));
                SweepOutcome::Failed { reason: e.to_string() }
            }
        };

        Some(attempt(Some(budget), Some(amount), outcome))
    }

    async fn send_and_confirm(
        &self,
        ctx: &SweepContext,
        request: TransferRequest,
        started: Instant,
    ) -> SweepResult<Confirmation> {
        let amount = request.value;
        let tx_hash = ctx.client.submit_transfer(request).await?;

        self.report(
            OutcomeKind::Submitted,
            format!(
                "📤 {} Sending {} ({}ms)",
                ctx.label(),
                ether(amount),
                started.elapsed().as_millis()
            ),
        );
        info!("{} sweep tx submitted: {}", ctx.label(), tx_hash);

        ctx.client.wait_for_confirmation(tx_hash).await
    }
}

#[async_trait]
impl BlockHandler for SweepEngine {
    async fn on_connected(&self, ctx: SweepContext) {
        let balance = ctx.observed_balance().await;
        if !balance.is_zero() {
            info!("{} initial balance: {}", ctx.label(), ether(balance));
        }
        self.on_balance_observed(&ctx, balance).await;
    }

    async fn on_new_block(&self, ctx: SweepContext, height: u64) {
        debug!("{} block {}", ctx.label(), height);
        let balance = ctx.observed_balance().await;
        self.on_balance_observed(&ctx, balance).await;
    }
}
