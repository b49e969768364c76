//! Application configuration loaded from environment variables.

use std::time::Duration;

use alloy_primitives::Address;

use crate::errors::{PortalError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Ethereum JSON-RPC endpoint of the node holding the wallet account
    pub rpc_url: String,
    /// Paper registry contract address
    pub contract_address: Address,
    /// Pins the acting account instead of following `eth_accounts`
    pub wallet_address: Option<Address>,
    /// Path to the SQLite database file (action journal)
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// IPFS HTTP API base, e.g. http://127.0.0.1:5001/api/v0
    pub ipfs_api_url: String,
    /// Public gateway used to build content links
    pub ipfs_gateway_url: String,
    /// Comments / diff service base URL
    pub collab_api_url: String,
    /// How often (in seconds) the wallet watcher re-checks the account
    pub wallet_poll_interval_secs: u64,
    /// Receipt polling interval while awaiting a transaction
    pub tx_poll_interval_ms: u64,
    /// Give up waiting for a receipt after this many seconds
    pub tx_confirm_timeout_secs: u64,
    /// Attempts for transient RPC transport failures
    pub rpc_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            contract_address: env_var("CONTRACT_ADDRESS")
                .map_err(|_| {
                    PortalError::Config(
                        "CONTRACT_ADDRESS environment variable is required".to_string(),
                    )
                })?
                .parse()
                .map_err(|_| PortalError::Config("Invalid CONTRACT_ADDRESS".to_string()))?,
            wallet_address: match env_var("WALLET_ADDRESS") {
                Ok(raw) if !raw.trim().is_empty() => Some(
                    raw.trim()
                        .parse()
                        .map_err(|_| PortalError::Config("Invalid WALLET_ADDRESS".to_string()))?,
                ),
                _ => None,
            },
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./portal_actions.db".to_string()),
            api_port: parsed("API_PORT", "3001")?,
            ipfs_api_url: env_var("IPFS_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5001/api/v0".to_string()),
            ipfs_gateway_url: env_var("IPFS_GATEWAY_URL")
                .unwrap_or_else(|_| "https://ipfs.io".to_string()),
            collab_api_url: env_var("COLLAB_API_URL")
                .unwrap_or_else(|_| "http://localhost:3002".to_string()),
            wallet_poll_interval_secs: parsed("WALLET_POLL_INTERVAL_SECS", "5")?,
            tx_poll_interval_ms: parsed("TX_POLL_INTERVAL_MS", "1000")?,
            tx_confirm_timeout_secs: parsed("TX_CONFIRM_TIMEOUT_SECS", "120")?,
            rpc_max_retries: parsed("RPC_MAX_RETRIES", "3")?,
        })
    }

    pub fn tx_poll_interval(&self) -> Duration {
        Duration::from_millis(self.tx_poll_interval_ms)
    }

    pub fn tx_confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_confirm_timeout_secs)
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    env_var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| PortalError::Config(format!("Invalid {key}")))
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| PortalError::Config(format!("Missing env var: {key}")))
}
