use std::time::Duration;
use thiserror::Error;

/// 兑换流水线错误
///
/// 每个阶段失败都立即返回给调用方，不做本地重试
#[derive(Debug, Clone, Error)]
pub enum SwapError {
    /// 地址 / mint 不是合法的 base58 公钥
    #[error("invalid identifier format for {field}: {value}")]
    InvalidIdentifierFormat { field: &'static str, value: String },

    /// 调用参数非法（数量为 0、滑点越界、优先费超上限等）
    #[error("invalid swap request: {0}")]
    InvalidRequest(String),

    /// 报价服务不可用或返回了无法解析的内容
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    /// 交易组装服务失败或没有返回候选交易
    #[error("assembly service error: {0}")]
    AssemblyServiceError(String),

    /// 远端返回的交易字节不能通过结构校验
    #[error("malformed transaction payload: {0}")]
    MalformedTransactionPayload(String),

    #[error("signing key unavailable: {0}")]
    SigningKeyUnavailable(String),

    /// 节点拒绝了交易（模拟失败、余额不足、blockhash 过期…）
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// 传输层失败，节点不可达
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("swap cancelled before {0}")]
    Cancelled(&'static str),

    #[error("swap deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// 无数据的错误分类，便于调用方按类型匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidIdentifierFormat,
    InvalidRequest,
    QuoteUnavailable,
    AssemblyServiceError,
    MalformedTransactionPayload,
    SigningKeyUnavailable,
    SubmissionRejected,
    NetworkUnreachable,
    Cancelled,
    DeadlineExceeded,
}

impl SwapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwapError::InvalidIdentifierFormat { .. } => ErrorKind::InvalidIdentifierFormat,
            SwapError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            SwapError::QuoteUnavailable(_) => ErrorKind::QuoteUnavailable,
            SwapError::AssemblyServiceError(_) => ErrorKind::AssemblyServiceError,
            SwapError::MalformedTransactionPayload(_) => ErrorKind::MalformedTransactionPayload,
            SwapError::SigningKeyUnavailable(_) => ErrorKind::SigningKeyUnavailable,
            SwapError::SubmissionRejected(_) => ErrorKind::SubmissionRejected,
            SwapError::NetworkUnreachable(_) => ErrorKind::NetworkUnreachable,
            SwapError::Cancelled(_) => ErrorKind::Cancelled,
            SwapError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
        }
    }

    /// 是否发生在提交之前（此时链上没有任何不可逆动作）
    ///
    /// 超时无法确定发生在哪个阶段，按提交阶段处理
    pub fn is_pre_submission(&self) -> bool {
        !matches!(
            self,
            SwapError::SubmissionRejected(_)
                | SwapError::NetworkUnreachable(_)
                | SwapError::DeadlineExceeded(_)
        )
    }

    pub(crate) fn invalid_identifier(field: &'static str, value: &str) -> Self {
        SwapError::InvalidIdentifierFormat {
            field,
            value: value.to_string(),
        }
    }
}
