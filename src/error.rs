//! Sweep error taxonomy
//!
//! Connection and query failures are absorbed by the session that hit them.
//! Estimation, submission and confirmation failures abort only the current
//! sweep attempt. Capacity and key errors surface to the caller of
//! `AccountRegistry::register`.
//!
//! Created: 2026-10-16

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("connection to {network} failed: {reason}")]
    Connection { network: String, reason: String },

    #[error("query failed: {0}")]
    Query(String),

    #[error("fee estimation failed: {0}")]
    Estimation(String),

    #[error("transfer submission failed: {0}")]
    Submission(String),

    #[error("confirmation failed: {0}")]
    Confirmation(String),

    #[error("capacity reached ({max} accounts)")]
    Capacity { max: usize },

    #[error("no endpoint pairs configured")]
    NoEndpoints,

    #[error("monitoring stopped during registration")]
    Stopped,

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SweepError {
    pub fn connection(network: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            network: network.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors the owning session logs and swallows instead of propagating
    pub fn is_absorbed(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Query(_))
    }

    /// Errors that abort a single sweep attempt; the balance stays eligible
    pub fn aborts_attempt(&self) -> bool {
        matches!(
            self,
            Self::Estimation(_) | Self::Submission(_) | Self::Confirmation(_)
        )
    }
}

pub type SweepResult<T> = std::result::Result<T, SweepError>;
