//! Per-session sweep guards
//!
//! `IgnoreSet` remembers exact balances already judged as dust so an
//! unchanged balance is never re-estimated. `SweepLock` admits at most one
//! in-flight transfer per (account, network); acquisition is a single
//! compare-and-swap so overlapping block handlers cannot both win.

use alloy::primitives::U256;
use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Balances known to be too small to sweep, keyed by exact wei value
#[derive(Debug, Default)]
pub struct IgnoreSet {
    balances: DashSet<U256>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ignored(&self, balance: &U256) -> bool {
        self.balances.contains(balance)
    }

    pub fn mark_ignored(&self, balance: U256) {
        if self.balances.insert(balance) {
            debug!("Balance {} wei marked as dust", balance);
        }
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

/// At-most-one in-flight sweep flag
#[derive(Debug, Default)]
pub struct SweepLock {
    held: AtomicBool,
}

impl SweepLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the caller now holds the lock, false if it was already held
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Acquire and return a guard that releases on drop (every exit path)
    pub fn try_lock(&self) -> Option<SweepLockGuard<'_>> {
        self.try_acquire().then_some(SweepLockGuard { lock: self })
    }
}

pub struct SweepLockGuard<'a> {
    lock: &'a SweepLock,
}

impl Drop for SweepLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Mutable sweep state owned by one NetworkSession.
/// Survives reconnects of the underlying connection.
#[derive(Debug, Default)]
pub struct SessionState {
    pub ignored: IgnoreSet,
    pub lock: SweepLock,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}
