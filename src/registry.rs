//! Account Registry
//!
//! Owns every registered account and its network sessions. Each account
//! takes the next unused endpoint pair; capacity is the number of
//! configured pairs. Slots are only freed by `stop_all`.
//!
//! Created: 2026-10-16

use crate::error::{SweepError, SweepResult};
use crate::notify::{OutcomeKind, OutcomeRecord};
use crate::session::{NetworkSession, SessionRuntime};
use crate::types::{EndpointPair, NetworkIdentity};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredAccount {
    pub index: usize,
    pub address: Address,
    /// Networks whose session connected; the rest were reported and skipped
    pub networks: Vec<NetworkIdentity>,
}

struct AccountEntry {
    index: usize,
    address: Address,
    sessions: Vec<NetworkSession>,
}

#[derive(Default)]
struct RegistryInner {
    accounts: Vec<AccountEntry>,
    /// Slots reserved by registrations still connecting
    pending: usize,
    /// Bumped by stop_all so in-flight registrations can tell they were cancelled
    epoch: u64,
}

impl RegistryInner {
    fn used_slots(&self) -> usize {
        self.accounts.len() + self.pending
    }
}

pub struct AccountRegistry {
    destination: Address,
    endpoint_pairs: Vec<EndpointPair>,
    runtime: SessionRuntime,
    inner: Mutex<RegistryInner>,
}

impl AccountRegistry {
    pub fn new(destination: Address, endpoint_pairs: Vec<EndpointPair>, runtime: SessionRuntime) -> Self {
        Self {
            destination,
            endpoint_pairs,
            runtime,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn report(&self, kind: OutcomeKind, message: String) {
        self.runtime.sink.report(OutcomeRecord::new(kind, message));
    }

    pub fn capacity(&self) -> usize {
        self.endpoint_pairs.len()
    }

    pub fn active_count(&self) -> usize {
        self.lock().accounts.len()
    }

    /// Startup notice: how many accounts can be registered
    pub fn announce_capacity(&self) {
        if self.capacity() == 0 {
            self.report(
                OutcomeKind::NoEndpoints,
                "❌ Error: ETH_URL1 and BSC_URL1 must be set in the environment".to_string(),
            );
        } else {
            self.report(
                OutcomeKind::CapacityAvailable,
                format!("✅ You can add up to {} accounts", self.capacity()),
            );
        }
    }

    /// Register an account by private key and start one session per network.
    ///
    /// Individual session failures are reported but do not fail the
    /// registration. An invalid key or exhausted capacity consumes no slot.
    pub async fn register(&self, private_key: &str) -> SweepResult<RegisteredAccount> {
        if self.endpoint_pairs.is_empty() {
            return Err(SweepError::NoEndpoints);
        }

        let signer = match PrivateKeySigner::from_str(private_key.trim()) {
            Ok(signer) => signer,
            Err(e) => {
                let err = SweepError::InvalidKey(e.to_string());
                self.report(
                    OutcomeKind::RegistrationFailed,
                    format!("❌ Error adding account: {}", err),
                );
                return Err(err);
            }
        };

        let (index, pair, epoch) = {
            let mut inner = self.lock();
            let used = inner.used_slots();
            if used >= self.capacity() {
                return Err(SweepError::Capacity { max: self.capacity() });
            }
            inner.pending += 1;
            (used + 1, self.endpoint_pairs[used].clone(), inner.epoch)
        };

        let address = signer.address();
        self.report(
            OutcomeKind::AccountRegistered,
            format!("✅ Account {} added: {}", index, address),
        );
        self.report(
            OutcomeKind::MonitoringStarted,
            format!("🚀 Starting monitoring for account {}", index),
        );

        let opened = join_all(
            pair.endpoints()
                .into_iter()
                .map(|(endpoint, network)| NetworkSession::open(&self.runtime, index, &signer, endpoint, network)),
        )
        .await;

        // Failures were already reported by the session
        let sessions: Vec<NetworkSession> = opened.into_iter().filter_map(Result::ok).collect();
        let networks: Vec<NetworkIdentity> = sessions.iter().map(NetworkSession::network).collect();

        {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                drop(inner);
                warn!("Account {} registration cancelled by stop", index);
                for session in &sessions {
                    session.close();
                }
                return Err(SweepError::Stopped);
            }
            inner.pending -= 1;
            inner.accounts.push(AccountEntry {
                index,
                address,
                sessions,
            });
        }

        info!(
            "Account {} ({}) watching {}/{} networks",
            index,
            address,
            networks.len(),
            NetworkIdentity::SUPPORTED.len()
        );

        Ok(RegisteredAccount {
            index,
            address,
            networks,
        })
    }

    /// Close every session of every account and free all slots.
    ///
    /// Teardown without drain: sweeps already past submission are not awaited.
    pub fn stop_all(&self) -> usize {
        let accounts = {
            let mut inner = self.lock();
            inner.epoch += 1;
            inner.pending = 0;
            std::mem::take(&mut inner.accounts)
        };

        for account in &accounts {
            for session in &account.sessions {
                session.close();
            }
        }

        self.report(OutcomeKind::MonitoringStopped, "🛑 All accounts stopped".to_string());
        accounts.len()
    }

    pub fn status(&self) -> StatusSummary {
        let inner = self.lock();
        StatusSummary {
            destination: self.destination,
            active: inner.accounts.len(),
            max: self.capacity(),
            accounts: inner
                .accounts
                .iter()
                .map(|account| AccountStatus {
                    index: account.index,
                    address: account.address,
                    sessions: account.sessions.len(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatus {
    pub index: usize,
    pub address: Address,
    pub sessions: usize,
}

/// Human-readable monitoring summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub destination: Address,
    pub active: usize,
    pub max: usize,
    pub accounts: Vec<AccountStatus>,
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "📊 Monitoring status")?;
        writeln!(f)?;
        writeln!(f, "🎯 Destination: {}", self.destination)?;
        writeln!(f, "📈 Active accounts: {}/{}", self.active, self.max)?;
        for account in &self.accounts {
            writeln!(f)?;
            writeln!(f, "💼 Account {}:", account.index)?;
            writeln!(f, "   {}", account.address)?;
            writeln!(f, "   Networks: {}", account.sessions)?;
        }
        Ok(())
    }
}
