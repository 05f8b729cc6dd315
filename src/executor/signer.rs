//! 交易签名
//!
//! 对规范消息字节签名，并把签名放进钱包对应的签名槽
use anyhow::Context;
use log::debug;
use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};
use std::fmt;
use std::sync::Arc;

use crate::error::SwapError;
use crate::types::{SignedTransaction, UnsignedTransaction};

/// 签名器
///
/// 流水线只通过这个 trait 使用私钥
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    fn sign(&self, unsigned: UnsignedTransaction) -> Result<SignedTransaction, SwapError>;
}

/// 钱包身份（进程启动时加载一次，之后只读）
#[derive(Clone)]
pub struct OwnerIdentity {
    keypair: Arc<Keypair>,
    pubkey: Pubkey,
}

impl OwnerIdentity {
    pub fn new(keypair: Keypair) -> Self {
        let pubkey = keypair.pubkey();
        Self {
            keypair: Arc::new(keypair),
            pubkey,
        }
    }

    /// 从 base58 私钥（64 字节 keypair）加载
    pub fn from_base58(secret: &str) -> Result<Self, SwapError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|_| SwapError::SigningKeyUnavailable("private key is not valid base58".to_string()))?;

        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|_| SwapError::SigningKeyUnavailable("private key is not a 64-byte keypair".to_string()))?;

        Ok(Self::new(keypair))
    }

    /// 校验配置里的钱包地址与私钥一致
    pub fn ensure_address(&self, expected: &str) -> anyhow::Result<()> {
        let expected: Pubkey = expected
            .parse()
            .context("WALLET_ADDRESS is not a valid public key")?;
        if expected != self.pubkey {
            anyhow::bail!("WALLET_ADDRESS {} does not match private key ({})", expected, self.pubkey);
        }
        Ok(())
    }
}

/// 只打印公钥，私钥永不输出
impl fmt::Debug for OwnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerIdentity")
            .field("pubkey", &self.pubkey)
            .finish_non_exhaustive()
    }
}

impl TransactionSigner for OwnerIdentity {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    fn sign(&self, unsigned: UnsignedTransaction) -> Result<SignedTransaction, SwapError> {
        let UnsignedTransaction {
            mut transaction,
            signer_index,
            message_bytes,
        } = unsigned;

        let slot_owner = transaction
            .message
            .static_account_keys()
            .get(signer_index)
            .copied();
        if slot_owner != Some(self.pubkey) || signer_index >= transaction.signatures.len() {
            return Err(SwapError::SigningKeyUnavailable(format!(
                "no signature slot for wallet {}",
                self.pubkey
            )));
        }

        let signature = self
            .keypair
            .try_sign_message(&message_bytes)
            .map_err(|e| SwapError::SigningKeyUnavailable(e.to_string()))?;

        transaction.signatures[signer_index] = signature;
        debug!("✍️  已签名 (slot {}): {}", signer_index, signature);

        Ok(SignedTransaction {
            transaction,
            signer_index,
            message_bytes,
        })
    }
}
