//! Discord Webhook Sink
//!
//! Forwards success / warning / error outcomes to a Discord webhook as a
//! single embed. Delivery is fire-and-forget: failures are logged and the
//! record is dropped.
//!
//! Usage:
//!   Set DISCORD_WEBHOOK environment variable to your webhook URL

use super::{OutcomeRecord, OutcomeSink, Severity};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Discord webhook message structure
#[derive(Serialize)]
struct DiscordMessage {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    color: u32,
    timestamp: Option<String>,
}

pub struct WebhookSink {
    webhook_url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn should_forward(record: &OutcomeRecord) -> bool {
        !matches!(record.severity(), Severity::Info)
    }

    fn build_message(record: &OutcomeRecord) -> DiscordMessage {
        let (title, color) = match record.severity() {
            Severity::Success => ("✅ Sweep agent", 0x00FF00),
            Severity::Warning => ("⚠️ Sweep agent", 0xFFA500),
            Severity::Error => ("❌ Sweep agent", 0xFF0000),
            Severity::Info => ("Sweep agent", 0x17A2B8),
        };

        DiscordMessage {
            content: None,
            embeds: vec![DiscordEmbed {
                title: title.to_string(),
                description: record.message.clone(),
                color,
                timestamp: Some(record.timestamp.to_rfc3339()),
            }],
        }
    }
}

impl OutcomeSink for WebhookSink {
    fn report(&self, record: OutcomeRecord) {
        if !Self::should_forward(&record) {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("No runtime available, webhook delivery skipped");
                return;
            }
        };

        let message = Self::build_message(&record);
        let client = self.client.clone();
        let url = self.webhook_url.clone();

        handle.spawn(async move {
            match client.post(&url).json(&message).send().await {
                Ok(response) => {
                    if !response.status().is_success() {
                        warn!("Discord webhook returned status: {}", response.status());
                    }
                }
                Err(e) => {
                    error!("Failed to send Discord alert: {}", e);
                }
            }
        });
    }
}
