use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::fmt;
use std::str::FromStr;

use crate::error::SwapError;

/// wSOL mint（原生 SOL 的代币化表示）
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// 交易格式版本选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxVersion {
    #[serde(rename = "V0")]
    V0,
    #[serde(rename = "LEGACY")]
    Legacy,
}

impl TxVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxVersion::V0 => "V0",
            TxVersion::Legacy => "LEGACY",
        }
    }
}

impl Default for TxVersion {
    fn default() -> Self {
        TxVersion::V0
    }
}

impl FromStr for TxVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_uppercase().as_str() {
            "V0" => Ok(TxVersion::V0),
            "LEGACY" => Ok(TxVersion::Legacy),
            _ => Err(anyhow::anyhow!("Unknown tx version: {}", s)),
        }
    }
}

impl fmt::Display for TxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 报价服务返回的报价，原样透传给交易组装服务
///
/// 本地不解析路由细节
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapQuote(serde_json::Value);

impl SwapQuote {
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// 报价中的 `id` 字段（仅用于日志）
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(|v| v.as_str())
    }
}

/// 远端返回的未签名交易字节
///
/// 不可信数据，只有 `TransactionBuilder::decode_transaction_payload` 会解析它
#[derive(Clone, PartialEq, Eq)]
pub struct TransactionPayload(Vec<u8>);

impl TransactionPayload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SwapError> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            SwapError::MalformedTransactionPayload(format!("invalid base64: {}", e))
        })?;
        Ok(Self(bytes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn untrusted_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TransactionPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionPayload({} bytes)", self.0.len())
    }
}

/// 已通过结构校验、尚未签名的交易
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub(crate) transaction: VersionedTransaction,
    /// 钱包在签名槽中的位置
    pub(crate) signer_index: usize,
    /// 从原始字节中截取的消息部分，签名就是对它做的
    pub(crate) message_bytes: Vec<u8>,
}

impl UnsignedTransaction {
    pub fn transaction(&self) -> &VersionedTransaction {
        &self.transaction
    }

    pub fn signer_index(&self) -> usize {
        self.signer_index
    }

    pub fn message_bytes(&self) -> &[u8] {
        &self.message_bytes
    }

    /// 必须签名的账户（消息头中前 num_required_signatures 个静态账户）
    pub fn required_signers(&self) -> &[Pubkey] {
        let required = self.transaction.message.header().num_required_signatures as usize;
        let keys = self.transaction.message.static_account_keys();
        &keys[..required.min(keys.len())]
    }
}

/// 已签名、可提交的交易
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub(crate) transaction: VersionedTransaction,
    pub(crate) signer_index: usize,
    pub(crate) message_bytes: Vec<u8>,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &VersionedTransaction {
        &self.transaction
    }

    pub fn message_bytes(&self) -> &[u8] {
        &self.message_bytes
    }

    /// 钱包的签名（同时也是第一个签名时的交易 ID）
    pub fn owner_signature(&self) -> Signature {
        self.transaction.signatures[self.signer_index]
    }

    /// 校验钱包签名是否覆盖了消息字节
    pub fn verify_owner_signature(&self, owner: &Pubkey) -> bool {
        self.owner_signature()
            .verify(owner.as_ref(), &self.message_bytes)
    }
}

/// 节点接受交易后返回的标识（不代表已最终确认）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Signature> for TransactionId {
    fn from(signature: Signature) -> Self {
        Self(signature.to_string())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
