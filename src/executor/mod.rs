// 交易构建器（组装服务 + 解码校验）
pub mod builder;

// 签名与提交
pub mod signer;
pub mod submitter;

// 导出
pub use builder::{BuildParams, TransactionBuilder};
pub use signer::{OwnerIdentity, TransactionSigner};
pub use submitter::{RpcSubmitter, TransactionSubmitter};
