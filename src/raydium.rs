//! Raydium Trade API 客户端
//!
//! 两个接口：
//! 1. GET  /compute/swap-base-in      获取报价
//! 2. POST /transaction/swap-base-in  用报价组装未签名交易（base64）
//!
//! 指令组装完全交给 Raydium，本地只负责派生 ATA、透传报价

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

use crate::error::SwapError;
use crate::types::{SwapQuote, TxVersion};

pub const DEFAULT_RAYDIUM_API_BASE: &str = "https://transaction-v1.raydium.io";

/// 报价请求参数
#[derive(Debug, Clone)]
pub struct QuoteParams {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// 输入数量（最小单位）
    pub amount: u64,
    pub slippage_bps: u32,
    pub tx_version: TxVersion,
}

/// 交易组装请求体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionRequest {
    /// 优先费（micro-lamports，字符串编码）
    pub compute_unit_price_micro_lamports: String,
    /// 报价服务的完整响应
    pub swap_response: SwapQuote,
    pub tx_version: TxVersion,
    pub wallet: String,
    pub wrap_sol: bool,
    pub unwrap_sol: bool,
    pub input_account: String,
    pub output_account: String,
}

#[derive(Debug, Deserialize)]
pub struct SwapTransactionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<SwapTransactionData>>,
}

#[derive(Debug, Deserialize)]
pub struct SwapTransactionData {
    /// base64 编码的交易
    pub transaction: String,
}

/// 报价客户端
#[async_trait::async_trait]
pub trait QuoteClient: Send + Sync {
    async fn fetch_quote(&self, params: &QuoteParams) -> Result<SwapQuote, SwapError>;
}

/// 交易组装客户端，返回所有候选交易（base64）
#[async_trait::async_trait]
pub trait SwapAssemblyClient: Send + Sync {
    async fn build_swap_transactions(
        &self,
        request: &SwapTransactionRequest,
    ) -> Result<Vec<String>, SwapError>;
}

/// Raydium HTTP 客户端（同时实现报价与组装）
#[derive(Clone)]
pub struct RaydiumClient {
    pub base_url: String,
    pub http_client: Client,
}

impl RaydiumClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("🔗 Raydium Trade API: {}", base_url);

        Ok(Self { base_url, http_client })
    }

    fn quote_url(&self) -> String {
        format!("{}/compute/swap-base-in", self.base_url)
    }

    fn transaction_url(&self) -> String {
        format!("{}/transaction/swap-base-in", self.base_url)
    }
}

/// 从错误响应体中提取 `msg`
fn service_message(body: &serde_json::Value) -> String {
    body.get("msg")
        .and_then(|v| v.as_str())
        .unwrap_or("no message")
        .to_string()
}

#[async_trait::async_trait]
impl QuoteClient for RaydiumClient {
    async fn fetch_quote(&self, params: &QuoteParams) -> Result<SwapQuote, SwapError> {
        if params.amount == 0 {
            return Err(SwapError::InvalidRequest("amount must be greater than zero".to_string()));
        }

        debug!(
            "📡 请求报价: {} -> {}, amount={}, slippageBps={}",
            params.input_mint, params.output_mint, params.amount, params.slippage_bps
        );

        let response = self
            .http_client
            .get(self.quote_url())
            .query(&[
                ("inputMint", params.input_mint.to_string()),
                ("outputMint", params.output_mint.to_string()),
                ("amount", params.amount.to_string()),
                ("slippageBps", params.slippage_bps.to_string()),
                ("txVersion", params.tx_version.as_str().to_string()),
            ])
            .send()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("❌ 报价服务返回 HTTP {}", status);
            return Err(SwapError::QuoteUnavailable(format!("HTTP {}", status)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("unparseable body: {}", e)))?;

        if !body.is_object() {
            return Err(SwapError::QuoteUnavailable("quote body is not an object".to_string()));
        }

        if body.get("success").and_then(|v| v.as_bool()) == Some(false) {
            return Err(SwapError::QuoteUnavailable(service_message(&body)));
        }

        let quote = SwapQuote::new(body);
        debug!("✅ 报价已获取: id={:?}", quote.id());
        Ok(quote)
    }
}

#[async_trait::async_trait]
impl SwapAssemblyClient for RaydiumClient {
    async fn build_swap_transactions(
        &self,
        request: &SwapTransactionRequest,
    ) -> Result<Vec<String>, SwapError> {
        debug!(
            "🏗️  请求组装交易: wallet={}, input={}, output={}, cu_price={}",
            request.wallet,
            request.input_account,
            request.output_account,
            request.compute_unit_price_micro_lamports
        );

        let response = self
            .http_client
            .post(self.transaction_url())
            .json(request)
            .send()
            .await
            .map_err(|e| SwapError::AssemblyServiceError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("❌ 组装服务返回 HTTP {}", status);
            return Err(SwapError::AssemblyServiceError(format!("HTTP {}", status)));
        }

        let body: SwapTransactionResponse = response
            .json()
            .await
            .map_err(|e| SwapError::AssemblyServiceError(format!("unparseable body: {}", e)))?;

        if body.success == Some(false) {
            return Err(SwapError::AssemblyServiceError(
                body.msg.unwrap_or_else(|| "service reported failure".to_string()),
            ));
        }

        let candidates: Vec<String> = body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.transaction)
            .collect();

        debug!("📦 组装服务返回 {} 个候选交易 (id={:?})", candidates.len(), body.id);
        Ok(candidates)
    }
}
