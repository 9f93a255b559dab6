//! Configuration loading and validation

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::transfer::{Amount, Denomination, SubmitSettings};
use crate::wallet::keyring::COSMOS_HD_PATH;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

/// Node endpoints, in priority order
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Address used for the sample balance query while probing endpoints.
    /// Falls back to the batch's own sender or recipient.
    #[serde(default)]
    pub probe_address: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            timeout_ms: default_timeout_ms(),
            probe_address: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: String,

    /// Bech32 human-readable part, e.g. `bbn`
    #[serde(default = "default_address_prefix")]
    pub address_prefix: String,

    /// Fee and transfer denomination in base units
    #[serde(default = "default_base_denom")]
    pub base_denom: String,

    #[serde(default = "default_display_denom")]
    pub display_denom: String,

    /// Decimal places between display and base denom
    #[serde(default = "default_exponent")]
    pub exponent: u32,

    /// Base units per gas, as a decimal string
    #[serde(default = "default_gas_price")]
    pub gas_price: String,

    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    #[serde(default = "default_hd_path")]
    pub hd_path: String,

    #[serde(default)]
    pub memo: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            address_prefix: default_address_prefix(),
            base_denom: default_base_denom(),
            display_denom: default_display_denom(),
            exponent: default_exponent(),
            gas_price: default_gas_price(),
            gas_limit: default_gas_limit(),
            hd_path: default_hd_path(),
            memo: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Balance left behind in every sending wallet, with unit
    #[serde(default = "default_reserve")]
    pub reserve: String,

    /// Per-recipient amount used when `distribute` gets no `--amount`
    #[serde(default)]
    pub distribute_amount: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            reserve: default_reserve(),
            distribute_amount: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per balance query or broadcast
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// One seed phrase per line
    #[serde(default = "default_seeds_file")]
    pub seeds: String,

    /// One recipient address per line
    #[serde(default = "default_recipients_file")]
    pub recipients: String,

    #[serde(default = "default_ledger_file")]
    pub ledger: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            seeds: default_seeds_file(),
            recipients: default_recipients_file(),
            ledger: default_ledger_file(),
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["https://babylon-testnet-api.nodes.guru".to_string()]
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_chain_id() -> String {
    "bbn-test-5".to_string()
}

fn default_address_prefix() -> String {
    "bbn".to_string()
}

fn default_base_denom() -> String {
    "ubbn".to_string()
}

fn default_display_denom() -> String {
    "bbn".to_string()
}

fn default_exponent() -> u32 {
    6
}

fn default_gas_price() -> String {
    "0.0025".to_string()
}

fn default_gas_limit() -> u64 {
    200_000
}

fn default_hd_path() -> String {
    COSMOS_HD_PATH.to_string()
}

fn default_reserve() -> String {
    "0.1bbn".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    2_000
}

fn default_seeds_file() -> String {
    "seed.txt".to_string()
}

fn default_recipients_file() -> String {
    "wallet.txt".to_string()
}

fn default_ledger_file() -> String {
    "transfers.csv".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix BATCH_)
            .add_source(
                config::Environment::with_prefix("BATCH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("network.endpoints")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.network.endpoints.is_empty() {
            anyhow::bail!("network.endpoints must list at least one node");
        }

        for endpoint in &self.network.endpoints {
            let parsed = url::Url::parse(endpoint)
                .with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Endpoint {} must be http(s)", endpoint);
            }
        }

        if self.network.timeout_ms == 0 {
            anyhow::bail!("network.timeout_ms must be positive");
        }

        if self.chain.chain_id.trim().is_empty() {
            anyhow::bail!("chain.chain_id must not be empty");
        }

        if self.chain.gas_limit == 0 {
            anyhow::bail!("chain.gas_limit must be positive");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        let denom = self.denomination()?;
        let reserve = self.reserve()?;
        let fee = self.fee()?;

        if let Some(amount) = self.distribute_amount()? {
            if amount.is_zero() {
                anyhow::bail!("transfer.distribute_amount must be positive");
            }
        }

        if let Some(address) = &self.network.probe_address {
            crate::wallet::sources::AddressValidator::new(&self.chain.address_prefix)?
                .validate(address)
                .context("Invalid network.probe_address")?;
        }

        // Warn when the reserve cannot pay for a single transfer
        if reserve < fee {
            tracing::warn!(
                "Reserve {} is below the fee of one transfer ({}); senders may be left unable to pay gas",
                denom.format(reserve),
                denom.format(fee)
            );
        }

        Ok(())
    }

    pub fn denomination(&self) -> Result<Denomination> {
        Denomination::new(
            self.chain.base_denom.clone(),
            self.chain.display_denom.clone(),
            self.chain.exponent,
        )
        .context("Invalid chain denomination")
    }

    pub fn reserve(&self) -> Result<Amount> {
        self.denomination()?
            .parse(&self.transfer.reserve)
            .context("Invalid transfer.reserve")
    }

    pub fn distribute_amount(&self) -> Result<Option<Amount>> {
        match &self.transfer.distribute_amount {
            Some(raw) => Ok(Some(
                self.denomination()?
                    .parse(raw)
                    .context("Invalid transfer.distribute_amount")?,
            )),
            None => Ok(None),
        }
    }

    pub fn gas_price(&self) -> Result<Decimal> {
        let price = Decimal::from_str(self.chain.gas_price.trim())
            .with_context(|| format!("Invalid chain.gas_price: {}", self.chain.gas_price))?;
        if price.is_sign_negative() {
            anyhow::bail!("chain.gas_price must not be negative");
        }
        Ok(price)
    }

    /// Flat fee per transfer: ceil(gas_limit * gas_price)
    pub fn fee(&self) -> Result<Amount> {
        self.denomination()?
            .fee_for_gas(self.chain.gas_limit, self.gas_price()?)
            .context("Invalid fee settings")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.network.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts, Duration::from_millis(self.retry.delay_ms))
    }

    pub fn submit_settings(&self) -> Result<SubmitSettings> {
        Ok(SubmitSettings {
            chain_id: self.chain.chain_id.clone(),
            denom: self.chain.base_denom.clone(),
            gas_limit: self.chain.gas_limit,
            fee: self.fee()?,
            memo: self.chain.memo.clone(),
        })
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        let endpoints: Vec<String> = self.network.endpoints.iter().map(|e| mask_url(e)).collect();

        format!(
            r#"Configuration:
  Network:
    endpoints: {:?}
    timeout: {}ms
    probe_address: {}
  Chain:
    chain_id: {}
    address_prefix: {}
    denom: {} ({} = 10^{} {})
    gas: {} x {} per gas
    hd_path: {}
  Transfer:
    reserve: {}
    distribute_amount: {}
  Retry:
    max_attempts: {}
    delay: {}ms
  Files:
    seeds: {}
    recipients: {}
    ledger: {}
"#,
            endpoints,
            self.network.timeout_ms,
            self.network.probe_address.as_deref().unwrap_or("(batch address)"),
            self.chain.chain_id,
            self.chain.address_prefix,
            self.chain.base_denom,
            self.chain.display_denom,
            self.chain.exponent,
            self.chain.base_denom,
            self.chain.gas_limit,
            self.chain.gas_price,
            self.chain.hd_path,
            self.transfer.reserve,
            self.transfer.distribute_amount.as_deref().unwrap_or("(prompt)"),
            self.retry.max_attempts,
            self.retry.delay_ms,
            self.files.seeds,
            self.files.recipients,
            self.files.ledger,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}
