//! Configuration management for the enclave wallet
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Sepolia testnet
const DEFAULT_CHAIN_ID: u64 = 11_155_111;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub chain: ChainConfig,
    pub signer: SignerConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_chain_name")]
    pub name: String,
    pub rpc_urls: Vec<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
    pub url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
    /// Pins the account instead of asking the signer for it
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_priority_fee_wei")]
    pub priority_fee_wei: u64,
    #[serde(default = "default_base_fee_multiplier")]
    pub base_fee_multiplier: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_chain_name() -> String {
    "sepolia".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_health_check_interval_secs() -> u64 {
    30
}

fn default_priority_fee_wei() -> u64 {
    1_000_000_000
}

fn default_base_fee_multiplier() -> u64 {
    2
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            priority_fee_wei: default_priority_fee_wei(),
            base_fee_multiplier: default_base_fee_multiplier(),
        }
    }
}

impl FeeConfig {
    pub fn priority_fee(&self) -> U256 {
        U256::from(self.priority_fee_wei)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Settings {
    /// Load settings from the file named by `ENCLAVE_WALLET_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("ENCLAVE_WALLET_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text, substituting `${VAR}` references first
    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chain.rpc_urls.iter().all(|u| u.trim().is_empty()) {
            anyhow::bail!("Chain {} has no RPC URLs configured", self.chain.name);
        }

        if self.signer.url.trim().is_empty() {
            anyhow::bail!("Signer URL must be set");
        }

        if self.fees.base_fee_multiplier == 0 {
            anyhow::bail!("Base fee multiplier must be at least 1");
        }

        if self.pinned_address()?.is_some() {
            tracing::info!("Account address pinned by configuration");
        }

        Ok(())
    }

    /// Account address pinned in `[signer]`, if any
    pub fn pinned_address(&self) -> Result<Option<Address>> {
        match self.signer.address.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<Address>()
                .map(Some)
                .with_context(|| format!("Invalid signer.address: {}", raw)),
        }
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern");

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
