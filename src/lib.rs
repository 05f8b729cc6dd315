// lib.rs - 导出公共接口供集成测试使用

pub mod ata;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod raydium;
pub mod types;

// 重新导出常用类型
pub use ata::{derive_associated_address, get_associated_token_address};
pub use config::Config;
pub use error::{ErrorKind, SwapError};
pub use executor::{BuildParams, OwnerIdentity, RpcSubmitter, TransactionBuilder, TransactionSigner, TransactionSubmitter};
pub use orchestrator::{CancelFlag, SwapOrchestrator, SwapRequest, SwapRun, SwapState};
pub use raydium::{QuoteClient, QuoteParams, RaydiumClient, SwapAssemblyClient, SwapTransactionRequest};
pub use types::{SignedTransaction, SwapQuote, TransactionId, TransactionPayload, TxVersion, UnsignedTransaction};
