//! Native-Balance Sweep Agent Library
//!
//! Watches registered accounts on Ethereum and BSC and forwards any native
//! balance that exceeds the transfer fee to a fixed destination address.
//!
//! Created: 2026-10-16

pub mod chain;
pub mod config;
pub mod control;
pub mod error;
pub mod notify;
pub mod registry;
pub mod session;
pub mod sweep;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, AgentConfig};
pub use error::{SweepError, SweepResult};
pub use registry::{AccountRegistry, RegisteredAccount, StatusSummary};
pub use session::{BlockHandler, NetworkSession, SessionRuntime};
pub use sweep::{FeeEstimator, SweepEngine};
pub use types::{EndpointPair, NetworkIdentity, SweepAttempt, SweepOutcome};
