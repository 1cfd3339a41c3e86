//! Notification Log
//!
//! Bounded newest-first list of outcome notifications served by the control
//! surface. Each report is echoed to tracing at its severity.

use super::{OutcomeKind, OutcomeRecord, OutcomeSink, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Most recent notifications kept
pub const MAX_NOTIFICATIONS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub kind: OutcomeKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<VecDeque<Notification>>,
    next_id: AtomicU64,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first, at most MAX_NOTIFICATIONS
    pub fn recent(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notification>> {
        // A poisoned log is still a valid log
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl OutcomeSink for NotificationLog {
    fn report(&self, record: OutcomeRecord) {
        let severity = record.severity();
        match severity {
            Severity::Info | Severity::Success => info!("[{:?}] {}", severity, record.message),
            Severity::Warning => warn!("[{:?}] {}", severity, record.message),
            Severity::Error => error!("[{:?}] {}", severity, record.message),
        }

        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            severity,
            kind: record.kind,
            message: record.message,
            timestamp: record.timestamp,
        };

        let mut entries = self.lock();
        entries.push_front(notification);
        entries.truncate(MAX_NOTIFICATIONS);
    }
}
