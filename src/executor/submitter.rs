//! 交易提交
//!
//! 只负责把已签名交易发给 RPC 并返回签名，不等待确认、不重试

use log::{debug, error, info};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
};
use solana_commitment_config::CommitmentConfig;
use solana_transaction_status::UiTransactionEncoding;
use std::sync::Arc;

use crate::error::SwapError;
use crate::types::{SignedTransaction, TransactionId};

/// 交易提交器
#[async_trait::async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, signed: &SignedTransaction) -> Result<TransactionId, SwapError>;
}

/// 基于 Solana JSON-RPC `sendTransaction` 的提交器
pub struct RpcSubmitter {
    rpc_client: Arc<RpcClient>,
    send_config: RpcSendTransactionConfig,
}

impl RpcSubmitter {
    pub fn new(rpc_endpoint: String, commitment: CommitmentConfig, skip_preflight: bool) -> Self {
        info!("📡 RPC 提交器已初始化");
        info!("   RPC 端点: {}", rpc_endpoint);
        info!("   Preflight: {}", if skip_preflight { "跳过" } else { "启用" });

        let rpc_client = Arc::new(RpcClient::new_with_commitment(rpc_endpoint, commitment));

        Self {
            rpc_client,
            send_config: RpcSendTransactionConfig {
                skip_preflight,
                preflight_commitment: Some(commitment.commitment),
                encoding: Some(UiTransactionEncoding::Base64),
                max_retries: Some(0),
                ..Default::default()
            },
        }
    }
}

/// 区分传输层失败与节点拒绝
///
/// 网关返回了 HTTP 状态码（429 / 503 …）说明端点可达，按拒绝处理
pub fn classify_client_error(err: &ClientError) -> SwapError {
    match err.kind() {
        ClientErrorKind::Reqwest(e) if e.status().is_some() => {
            SwapError::SubmissionRejected(err.to_string())
        }
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
            SwapError::NetworkUnreachable(err.to_string())
        }
        _ => SwapError::SubmissionRejected(err.to_string()),
    }
}

#[async_trait::async_trait]
impl TransactionSubmitter for RpcSubmitter {
    async fn submit(&self, signed: &SignedTransaction) -> Result<TransactionId, SwapError> {
        debug!("📤 发送交易: {}", signed.owner_signature());

        match self
            .rpc_client
            .send_transaction_with_config(signed.transaction(), self.send_config.clone())
            .await
        {
            Ok(signature) => {
                info!("✅ 交易已被节点接受: {}", signature);
                Ok(TransactionId::from(signature))
            }
            Err(e) => {
                error!("❌ 发送失败: {}", e);
                Err(classify_client_error(&e))
            }
        }
    }
}
