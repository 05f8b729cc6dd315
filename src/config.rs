use anyhow::{Context, Result};
use serde::Deserialize;
use solana_commitment_config::CommitmentConfig;
use std::fmt;
use std::time::Duration;

use crate::executor::signer::{OwnerIdentity, TransactionSigner};
use crate::raydium::DEFAULT_RAYDIUM_API_BASE;
use crate::types::TxVersion;

fn default_commitment_level() -> String {
    "confirmed".to_string()
}

fn default_raydium_api_base() -> String {
    DEFAULT_RAYDIUM_API_BASE.to_string()
}

fn default_compute_unit_price() -> u64 {
    600_000
}

fn default_max_compute_unit_price() -> u64 {
    5_000_000
}

fn default_slippage_percent() -> f64 {
    10.0
}

fn default_tx_version() -> String {
    "V0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_swap_deadline_secs() -> u64 {
    60
}

/// 全局配置
///
/// 启动时加载一次，之后以 `Arc<Config>` 只读共享
#[derive(Clone, Deserialize)]
pub struct Config {
    // 网络配置
    pub rpc_endpoint: String,
    #[serde(default = "default_commitment_level")]
    pub commitment_level: String,
    #[serde(default = "default_raydium_api_base")]
    pub raydium_api_base: String,

    // 钱包配置
    pub wallet_private_key: String,
    #[serde(default)]
    pub wallet_address: Option<String>,

    // 优先费（micro-lamports / CU）
    #[serde(default = "default_compute_unit_price")]
    pub compute_unit_price: u64,
    #[serde(default = "default_max_compute_unit_price")]
    pub max_compute_unit_price: u64,

    // 交易参数
    #[serde(default = "default_slippage_percent")]
    pub default_slippage_percent: f64,
    #[serde(default = "default_tx_version")]
    pub tx_version: String,
    #[serde(default = "default_true")]
    pub wrap_sol: bool,
    #[serde(default = "default_true")]
    pub unwrap_sol: bool,
    #[serde(default)]
    pub skip_preflight: bool,

    // 超时
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_swap_deadline_secs")]
    pub swap_deadline_secs: u64,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = envy::from_env::<Config>()
            .context("Failed to load configuration from environment variables")?;

        config.validate()?;

        Ok(config)
    }

    /// 从键值对加载（测试 / 嵌入调用）
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .context("Failed to load configuration from variables")?;

        config.validate()?;

        Ok(config)
    }

    /// 验证配置参数
    fn validate(&self) -> Result<()> {
        if self.rpc_endpoint.trim().is_empty() {
            anyhow::bail!("rpc_endpoint must not be empty");
        }

        if self.raydium_api_base.trim().is_empty() {
            anyhow::bail!("raydium_api_base must not be empty");
        }

        if self.wallet_private_key.trim().is_empty() {
            anyhow::bail!("wallet_private_key must not be empty");
        }

        if self.compute_unit_price > self.max_compute_unit_price {
            anyhow::bail!(
                "compute_unit_price ({}) must be <= max_compute_unit_price ({})",
                self.compute_unit_price,
                self.max_compute_unit_price
            );
        }

        if !(0.0..=100.0).contains(&self.default_slippage_percent) {
            anyhow::bail!("default_slippage_percent must be between 0.0 and 100.0");
        }

        self.tx_version
            .parse::<TxVersion>()
            .context("tx_version must be one of: V0, LEGACY")?;

        if !["processed", "confirmed", "finalized"].contains(&self.commitment_level.to_lowercase().as_str()) {
            anyhow::bail!("commitment_level must be one of: processed, confirmed, finalized");
        }

        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be > 0");
        }

        if self.swap_deadline_secs == 0 {
            anyhow::bail!("swap_deadline_secs must be > 0");
        }

        Ok(())
    }

    /// 加载钱包，并校验 wallet_address（若配置）
    pub fn get_owner_identity(&self) -> Result<OwnerIdentity> {
        let owner = OwnerIdentity::from_base58(&self.wallet_private_key)
            .context("Failed to load wallet_private_key")?;

        if let Some(address) = &self.wallet_address {
            owner.ensure_address(address)?;
        }

        log::info!("Wallet: {}", owner.pubkey());
        Ok(owner)
    }

    /// 获取 CommitmentConfig
    pub fn get_commitment_config(&self) -> CommitmentConfig {
        match self.commitment_level.to_lowercase().as_str() {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        }
    }

    pub fn get_tx_version(&self) -> TxVersion {
        self.tx_version.parse().unwrap_or_default()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn swap_deadline(&self) -> Duration {
        Duration::from_secs(self.swap_deadline_secs)
    }

    /// 打印配置摘要（不含私钥）
    pub fn print_summary(&self) {
        log::info!("=== Configuration Summary ===");
        log::info!("Network:");
        log::info!("  RPC: {}", self.rpc_endpoint);
        log::info!("  Commitment: {}", self.commitment_level);
        log::info!("  Raydium API: {}", self.raydium_api_base);
        log::info!("");
        log::info!("Priority Fee:");
        log::info!("  CU Price: {} micro-lamports", self.compute_unit_price);
        log::info!("  CU Price Cap: {} micro-lamports", self.max_compute_unit_price);
        log::info!("");
        log::info!("Swap:");
        log::info!("  Default Slippage: {:.1}%", self.default_slippage_percent);
        log::info!("  Tx Version: {}", self.get_tx_version());
        log::info!("  Wrap SOL: {}", self.wrap_sol);
        log::info!("  Unwrap SOL: {}", self.unwrap_sol);
        log::info!("  Skip Preflight: {}", self.skip_preflight);
        log::info!("  Deadline: {}s", self.swap_deadline_secs);
        log::info!("=============================");
    }
}

/// 私钥打码
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_endpoint", &self.rpc_endpoint)
            .field("commitment_level", &self.commitment_level)
            .field("raydium_api_base", &self.raydium_api_base)
            .field("wallet_private_key", &"<redacted>")
            .field("wallet_address", &self.wallet_address)
            .field("compute_unit_price", &self.compute_unit_price)
            .field("max_compute_unit_price", &self.max_compute_unit_price)
            .field("default_slippage_percent", &self.default_slippage_percent)
            .field("tx_version", &self.tx_version)
            .field("wrap_sol", &self.wrap_sol)
            .field("unwrap_sol", &self.unwrap_sol)
            .field("skip_preflight", &self.skip_preflight)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("swap_deadline_secs", &self.swap_deadline_secs)
            .finish()
    }
}
