//! Sweep Module
//!
//! Per-balance sweep decision and execution.
//!
//! Architecture:
//!     fees.rs  : fixed-shape fee budget for a native transfer
//!     guard.rs : IgnoreSet (dust memory) and SweepLock (single in-flight)
//!     engine.rs: observed balance → dust / transfer → confirmation

pub mod engine;
pub mod fees;
pub mod guard;

pub use engine::{SweepContext, SweepEngine};
pub use fees::FeeEstimator;
pub use guard::{IgnoreSet, SessionState, SweepLock, SweepLockGuard};
