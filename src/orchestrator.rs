//! 兑换流水线
//!
//! 报价 -> 组装 -> 签名 -> 提交，严格顺序执行，任一阶段失败直接进入 Failed，不重试

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ata::parse_identifier;
use crate::config::Config;
use crate::error::SwapError;
use crate::executor::builder::{BuildParams, TransactionBuilder};
use crate::executor::signer::TransactionSigner;
use crate::executor::submitter::{RpcSubmitter, TransactionSubmitter};
use crate::raydium::{QuoteClient, QuoteParams, RaydiumClient, SwapAssemblyClient};
use crate::types::TransactionId;

/// 流水线状态
#[derive(Debug, Clone)]
pub enum SwapState {
    Idle,
    QuoteFetching,
    Building,
    Signing,
    Submitting,
    Succeeded(TransactionId),
    Failed(SwapError),
}

impl SwapState {
    pub fn name(&self) -> &'static str {
        match self {
            SwapState::Idle => "idle",
            SwapState::QuoteFetching => "quote fetching",
            SwapState::Building => "building",
            SwapState::Signing => "signing",
            SwapState::Submitting => "submitting",
            SwapState::Succeeded(_) => "succeeded",
            SwapState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapState::Succeeded(_) | SwapState::Failed(_))
    }
}

impl fmt::Display for SwapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 一次兑换请求
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// 输入数量（最小单位）
    pub amount: u64,
    /// 滑点百分比，None 时使用配置默认值
    pub slippage_percent: Option<f64>,
}

impl SwapRequest {
    pub fn new(input_mint: impl Into<String>, output_mint: impl Into<String>, amount: u64) -> Self {
        Self {
            input_mint: input_mint.into(),
            output_mint: output_mint.into(),
            amount,
            slippage_percent: None,
        }
    }

    pub fn with_slippage_percent(mut self, percent: f64) -> Self {
        self.slippage_percent = Some(percent);
        self
    }
}

#[derive(Debug, Clone)]
pub struct StateTransition {
    pub state: SwapState,
    pub at: DateTime<Utc>,
}

/// 一次流水线执行的完整记录
#[derive(Debug)]
pub struct SwapRun {
    pub history: Vec<StateTransition>,
    pub outcome: Result<TransactionId, SwapError>,
}

impl SwapRun {
    pub fn states(&self) -> Vec<&SwapState> {
        self.history.iter().map(|t| &t.state).collect()
    }

    pub fn final_state(&self) -> Option<&SwapState> {
        self.history.last().map(|t| &t.state)
    }

    /// 是否到达过某个阶段
    pub fn visited(&self, name: &str) -> bool {
        self.history.iter().any(|t| t.state.name() == name)
    }

    pub fn into_result(self) -> Result<TransactionId, SwapError> {
        self.outcome
    }
}

/// 取消标志，只在阶段之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 滑点百分比 -> bps（10% -> 1000）
pub fn slippage_percent_to_bps(percent: f64) -> Result<u32, SwapError> {
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(SwapError::InvalidRequest(format!(
            "slippage percent must be between 0 and 100, got {}",
            percent
        )));
    }
    Ok((percent * 100.0).round() as u32)
}

/// 兑换编排器
pub struct SwapOrchestrator {
    config: Arc<Config>,
    quote_client: Arc<dyn QuoteClient>,
    builder: TransactionBuilder,
    signer: Arc<dyn TransactionSigner>,
    submitter: Arc<dyn TransactionSubmitter>,
    cancel: CancelFlag,
}

impl SwapOrchestrator {
    pub fn new(
        config: Arc<Config>,
        quote_client: Arc<dyn QuoteClient>,
        assembly_client: Arc<dyn SwapAssemblyClient>,
        signer: Arc<dyn TransactionSigner>,
        submitter: Arc<dyn TransactionSubmitter>,
    ) -> Self {
        Self {
            config,
            quote_client,
            builder: TransactionBuilder::new(assembly_client),
            signer,
            submitter,
            cancel: CancelFlag::new(),
        }
    }

    /// 按配置接入 Raydium 与 RPC
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let raydium = Arc::new(RaydiumClient::new(config.raydium_api_base.clone(), config.http_timeout())?);
        let owner = Arc::new(config.get_owner_identity()?);
        let submitter = Arc::new(RpcSubmitter::new(
            config.rpc_endpoint.clone(),
            config.get_commitment_config(),
            config.skip_preflight,
        ));

        Ok(Self::new(config, raydium.clone(), raydium, owner, submitter))
    }

    /// 共享外部取消标志
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 执行一次 swap-base-in，返回状态历史与结果
    pub async fn perform_swap_base_in(&self, request: &SwapRequest) -> SwapRun {
        let started = Instant::now();
        let mut history = vec![StateTransition {
            state: SwapState::Idle,
            at: Utc::now(),
        }];

        info!(
            "🔄 Swap {} -> {}, amount={}",
            request.input_mint, request.output_mint, request.amount
        );

        let outcome = self.run_stages(request, &mut history).await;

        match &outcome {
            Ok(txid) => {
                info!("✅ Transaction successful: {} ({:?})", txid, started.elapsed());
                history.push(StateTransition {
                    state: SwapState::Succeeded(txid.clone()),
                    at: Utc::now(),
                });
            }
            Err(e) => {
                if e.is_pre_submission() {
                    error!("❌ Transaction creation failed: {}", e);
                } else {
                    error!("❌ Transaction rejected: {}", e);
                }
                history.push(StateTransition {
                    state: SwapState::Failed(e.clone()),
                    at: Utc::now(),
                });
            }
        }

        SwapRun { history, outcome }
    }

    pub async fn execute(&self, request: &SwapRequest) -> Result<TransactionId, SwapError> {
        self.perform_swap_base_in(request).await.into_result()
    }

    /// 整个流水线包在调用方给定的截止时间内
    pub async fn execute_with_deadline(
        &self,
        request: &SwapRequest,
        deadline: Duration,
    ) -> Result<TransactionId, SwapError> {
        match tokio::time::timeout(deadline, self.execute(request)).await {
            Ok(result) => result,
            Err(_) => {
                error!("⏰ Swap deadline of {:?} exceeded", deadline);
                Err(SwapError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn run_stages(
        &self,
        request: &SwapRequest,
        history: &mut Vec<StateTransition>,
    ) -> Result<TransactionId, SwapError> {
        let quote_params = self.quote_params(request)?;
        let build_params = self.build_params()?;
        let owner = self.signer.pubkey();

        self.enter(history, SwapState::QuoteFetching)?;
        let quote = self.quote_client.fetch_quote(&quote_params).await?;

        self.enter(history, SwapState::Building)?;
        let unsigned = self
            .builder
            .build_unsigned_transaction(
                quote,
                &owner,
                &quote_params.input_mint,
                &quote_params.output_mint,
                &build_params,
            )
            .await?;

        self.enter(history, SwapState::Signing)?;
        let signed = self.signer.sign(unsigned)?;

        // 签名后取消：丢弃已签名交易，不提交
        self.enter(history, SwapState::Submitting)?;
        self.submitter.submit(&signed).await
    }

    fn enter(&self, history: &mut Vec<StateTransition>, state: SwapState) -> Result<(), SwapError> {
        if self.cancel.is_cancelled() {
            warn!("🛑 Swap cancelled before {}", state);
            return Err(SwapError::Cancelled(state.name()));
        }
        debug!("➡️  {}", state);
        history.push(StateTransition { state, at: Utc::now() });
        Ok(())
    }

    fn quote_params(&self, request: &SwapRequest) -> Result<QuoteParams, SwapError> {
        if request.amount == 0 {
            return Err(SwapError::InvalidRequest("amount must be greater than zero".to_string()));
        }

        let input_mint = parse_identifier("input_mint", &request.input_mint)?;
        let output_mint = parse_identifier("output_mint", &request.output_mint)?;

        let percent = request
            .slippage_percent
            .unwrap_or(self.config.default_slippage_percent);
        let slippage_bps = slippage_percent_to_bps(percent)?;

        Ok(QuoteParams {
            input_mint,
            output_mint,
            amount: request.amount,
            slippage_bps,
            tx_version: self.config.get_tx_version(),
        })
    }

    fn build_params(&self) -> Result<BuildParams, SwapError> {
        if self.config.compute_unit_price > self.config.max_compute_unit_price {
            return Err(SwapError::InvalidRequest(format!(
                "priority fee {} exceeds cap {} micro-lamports",
                self.config.compute_unit_price, self.config.max_compute_unit_price
            )));
        }

        Ok(BuildParams {
            compute_unit_price_micro_lamports: self.config.compute_unit_price,
            wrap_sol: self.config.wrap_sol,
            unwrap_sol: self.config.unwrap_sol,
            tx_version: self.config.get_tx_version(),
        })
    }
}
