use log::{debug, info, warn};
use solana_sdk::{
    pubkey::Pubkey,
    transaction::{TransactionVersion, VersionedTransaction},
};
use std::sync::Arc;

use crate::ata::get_associated_token_address;
use crate::error::SwapError;
use crate::raydium::{SwapAssemblyClient, SwapTransactionRequest};
use crate::types::{SwapQuote, TransactionPayload, TxVersion, UnsignedTransaction};

/// 组装参数
#[derive(Debug, Clone)]
pub struct BuildParams {
    /// 优先费（micro-lamports / CU）
    pub compute_unit_price_micro_lamports: u64,
    /// 输入为原生 SOL 时自动 wrap
    pub wrap_sol: bool,
    /// 输出为 wSOL 时自动 unwrap
    pub unwrap_sol: bool,
    pub tx_version: TxVersion,
}

/// 交易构建器
///
/// 报价 + 钱包 + 派生 ATA -> 组装服务 -> 结构校验后的未签名交易
pub struct TransactionBuilder {
    assembly: Arc<dyn SwapAssemblyClient>,
}

impl TransactionBuilder {
    pub fn new(assembly: Arc<dyn SwapAssemblyClient>) -> Self {
        Self { assembly }
    }

    /// 构建未签名交易
    ///
    /// 1. 派生输入 / 输出 ATA
    /// 2. 组装请求（报价原样透传）
    /// 3. 调用组装服务，取第一个候选
    /// 4. 解码并做结构校验
    pub async fn build_unsigned_transaction(
        &self,
        quote: SwapQuote,
        owner: &Pubkey,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        params: &BuildParams,
    ) -> Result<UnsignedTransaction, SwapError> {
        let input_account = get_associated_token_address(owner, input_mint);
        let output_account = get_associated_token_address(owner, output_mint);

        debug!("🏗️  派生 ATA:");
        debug!("   输入账户: {}", input_account);
        debug!("   输出账户: {}", output_account);

        let request = SwapTransactionRequest {
            compute_unit_price_micro_lamports: params.compute_unit_price_micro_lamports.to_string(),
            swap_response: quote,
            tx_version: params.tx_version,
            wallet: owner.to_string(),
            wrap_sol: params.wrap_sol,
            unwrap_sol: params.unwrap_sol,
            input_account: input_account.to_string(),
            output_account: output_account.to_string(),
        };

        let candidates = self.assembly.build_swap_transactions(&request).await?;
        if candidates.len() > 1 {
            debug!("组装服务返回 {} 个候选，使用第一个", candidates.len());
        }

        let first = candidates.into_iter().next().ok_or_else(|| {
            SwapError::AssemblyServiceError("no transaction candidates returned".to_string())
        })?;

        let payload = TransactionPayload::from_base64(&first)?;
        let unsigned = Self::decode_transaction_payload(&payload, owner, params.tx_version)?;

        info!(
            "📦 未签名交易已就绪: {} bytes, {} 个签名槽",
            payload.len(),
            unsigned.transaction().signatures.len()
        );

        Ok(unsigned)
    }

    /// 解码远端返回的交易字节
    ///
    /// 这里是唯一的信任边界，通过以下校验后才允许签名：
    /// - bincode 可解码，且没有多余字节
    /// - sanitize 通过（账户索引、签名数等）
    /// - 版本与请求一致
    /// - 签名槽数量 == num_required_signatures
    /// - 钱包在必须签名者之中
    /// - 原始字节以规范消息编码结尾（签名的字节与链上重建的一致）
    pub fn decode_transaction_payload(
        payload: &TransactionPayload,
        owner: &Pubkey,
        expected_version: TxVersion,
    ) -> Result<UnsignedTransaction, SwapError> {
        let bytes = payload.untrusted_bytes();
        if bytes.is_empty() {
            return Err(SwapError::MalformedTransactionPayload("empty payload".to_string()));
        }

        let transaction: VersionedTransaction = bincode::deserialize(bytes).map_err(|e| {
            SwapError::MalformedTransactionPayload(format!("cannot decode versioned transaction: {}", e))
        })?;

        let encoded_len = bincode::serialized_size(&transaction).map_err(|e| {
            SwapError::MalformedTransactionPayload(format!("cannot re-measure transaction: {}", e))
        })? as usize;
        if encoded_len != bytes.len() {
            return Err(SwapError::MalformedTransactionPayload(format!(
                "{} trailing bytes after transaction",
                bytes.len().saturating_sub(encoded_len)
            )));
        }

        transaction.sanitize().map_err(|e| {
            SwapError::MalformedTransactionPayload(format!("sanitize failed: {}", e))
        })?;

        let actual_version = match transaction.version() {
            TransactionVersion::Legacy(_) => Some(TxVersion::Legacy),
            TransactionVersion::Number(0) => Some(TxVersion::V0),
            TransactionVersion::Number(_) => None,
        };
        if actual_version != Some(expected_version) {
            return Err(SwapError::MalformedTransactionPayload(format!(
                "version mismatch: expected {}, got {:?}",
                expected_version,
                transaction.version()
            )));
        }

        let required = transaction.message.header().num_required_signatures as usize;
        if transaction.signatures.len() != required {
            return Err(SwapError::MalformedTransactionPayload(format!(
                "{} signature slots for {} required signers",
                transaction.signatures.len(),
                required
            )));
        }

        let signer_index = transaction
            .message
            .static_account_keys()
            .iter()
            .take(required)
            .position(|key| key == owner)
            .ok_or_else(|| {
                SwapError::MalformedTransactionPayload(format!(
                    "wallet {} is not a required signer",
                    owner
                ))
            })?;

        let message_bytes = transaction.message.serialize();
        if !bytes.ends_with(&message_bytes) {
            warn!("⚠️  消息字节与规范编码不一致，拒绝签名");
            return Err(SwapError::MalformedTransactionPayload(
                "message bytes are not canonically encoded".to_string(),
            ));
        }

        Ok(UnsignedTransaction {
            transaction,
            signer_index,
            message_bytes,
        })
    }
}
