//! Outcome Reporting Module
//!
//! Every sweep step and connection lifecycle event is reported as an
//! `OutcomeRecord`. Sinks decide what to do with them: the in-memory
//! `NotificationLog` backs the control surface, `WebhookSink` forwards
//! noteworthy records to a Discord webhook.
//!
//! Created: 2026-10-16

pub mod history;
pub mod webhook;

pub use history::{Notification, NotificationLog, MAX_NOTIFICATIONS};
pub use webhook::WebhookSink;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Display severity of an outcome (serialized as the notification `type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    CapacityAvailable,
    NoEndpoints,
    AccountRegistered,
    RegistrationFailed,
    MonitoringStarted,
    MonitoringStopped,
    Connecting,
    Connected,
    ConnectionFailed,
    ConnectionLost,
    BalanceDetected,
    DustSkipped,
    Submitted,
    Confirmed,
    SweepFailed,
}

impl OutcomeKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::CapacityAvailable
            | Self::MonitoringStarted
            | Self::Connecting
            | Self::Submitted => Severity::Info,
            Self::AccountRegistered
            | Self::Connected
            | Self::BalanceDetected
            | Self::Confirmed => Severity::Success,
            Self::DustSkipped | Self::MonitoringStopped | Self::ConnectionLost => Severity::Warning,
            Self::NoEndpoints
            | Self::RegistrationFailed
            | Self::ConnectionFailed
            | Self::SweepFailed => Severity::Error,
        }
    }
}

/// Structured outcome: kind, human message, timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub kind: OutcomeKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn new(kind: OutcomeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

/// Consumer of outcome records. Must not block: called from sweep paths.
pub trait OutcomeSink: Send + Sync {
    fn report(&self, record: OutcomeRecord);
}

/// Forwards each record to every inner sink
pub struct FanoutSink {
    sinks: Vec<Arc<dyn OutcomeSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn OutcomeSink>>) -> Self {
        Self { sinks }
    }
}

impl OutcomeSink for FanoutSink {
    fn report(&self, record: OutcomeRecord) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.report(record.clone());
            }
            last.report(record);
        }
    }
}
