//! Shared mocks for integration tests.
#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine};
use rayswap::{
    Config, OwnerIdentity, QuoteClient, QuoteParams, SignedTransaction, SwapAssemblyClient, SwapError,
    SwapQuote, SwapTransactionRequest, TransactionId, TransactionSigner, TransactionSubmitter,
    UnsignedTransaction,
};
use solana_sdk::{
    hash::Hash,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
use solana_system_interface::instruction::transfer;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const WSOL: &str = "So11111111111111111111111111111111111111112";
pub const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// 组装服务会返回的未签名交易，seed 决定 blockhash
pub fn unsigned_swap_fixture(payer: &Pubkey, seed: u64) -> VersionedTransaction {
    let mut hash = [7u8; 32];
    hash[..8].copy_from_slice(&seed.to_le_bytes());

    let ix = transfer(payer, &Pubkey::new_unique(), 100_000);
    let message = v0::Message::try_compile(payer, &[ix], &[], Hash::new_from_array(hash)).unwrap();
    VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::V0(message),
    }
}

pub fn encode_fixture(tx: &VersionedTransaction) -> String {
    STANDARD.encode(bincode::serialize(tx).unwrap())
}

pub fn test_config(keypair: &Keypair, raydium_api_base: &str, rpc_endpoint: &str) -> Arc<Config> {
    Arc::new(
        Config::from_vars(vec![
            ("RPC_ENDPOINT".to_string(), rpc_endpoint.to_string()),
            ("RAYDIUM_API_BASE".to_string(), raydium_api_base.to_string()),
            ("WALLET_PRIVATE_KEY".to_string(), keypair.to_base58_string()),
            ("HTTP_TIMEOUT_SECS".to_string(), "5".to_string()),
        ])
        .unwrap(),
    )
}

// ---------------------------------------------------------------------------
// Trait mocks
// ---------------------------------------------------------------------------

pub struct MockQuote {
    pub calls: AtomicUsize,
    pub failure: Option<SwapError>,
}

impl MockQuote {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), failure: None })
    }

    pub fn failing(err: SwapError) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), failure: Some(err) })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl QuoteClient for MockQuote {
    async fn fetch_quote(&self, params: &QuoteParams) -> Result<SwapQuote, SwapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(SwapQuote::new(serde_json::json!({
                "id": "mock-quote",
                "success": true,
                "data": {
                    "inputMint": params.input_mint.to_string(),
                    "outputMint": params.output_mint.to_string(),
                    "inputAmount": params.amount.to_string(),
                    "slippageBps": params.slippage_bps,
                }
            }))),
        }
    }
}

pub enum AssemblyMode {
    /// 每次返回一笔新交易（blockhash 不同）
    Valid,
    Empty,
    Garbage,
    Fail(SwapError),
}

pub struct MockAssembly {
    pub owner: Pubkey,
    pub calls: AtomicUsize,
    pub mode: AssemblyMode,
}

impl MockAssembly {
    pub fn new(owner: Pubkey, mode: AssemblyMode) -> Arc<Self> {
        Arc::new(Self { owner, calls: AtomicUsize::new(0), mode })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SwapAssemblyClient for MockAssembly {
    async fn build_swap_transactions(
        &self,
        _request: &SwapTransactionRequest,
    ) -> Result<Vec<String>, SwapError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
        match &self.mode {
            AssemblyMode::Valid => Ok(vec![encode_fixture(&unsigned_swap_fixture(&self.owner, n))]),
            AssemblyMode::Empty => Ok(Vec::new()),
            AssemblyMode::Garbage => Ok(vec![STANDARD.encode([0xffu8; 48])]),
            AssemblyMode::Fail(err) => Err(err.clone()),
        }
    }
}

/// 统计签名次数的签名器
pub struct CountingSigner {
    pub inner: OwnerIdentity,
    pub calls: AtomicUsize,
}

impl CountingSigner {
    pub fn new(keypair: Keypair) -> Arc<Self> {
        Arc::new(Self {
            inner: OwnerIdentity::new(keypair),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransactionSigner for CountingSigner {
    fn pubkey(&self) -> Pubkey {
        self.inner.pubkey()
    }

    fn sign(&self, unsigned: UnsignedTransaction) -> Result<SignedTransaction, SwapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign(unsigned)
    }
}

pub struct MockSubmitter {
    pub calls: AtomicUsize,
    pub rejection: Option<SwapError>,
    pub delay: Option<Duration>,
    pub submitted: Mutex<Vec<SignedTransaction>>,
}

impl MockSubmitter {
    pub fn accepting() -> Arc<Self> {
        Self::build(None, None)
    }

    pub fn rejecting(err: SwapError) -> Arc<Self> {
        Self::build(Some(err), None)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(None, Some(delay))
    }

    fn build(rejection: Option<SwapError>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            rejection,
            delay,
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TransactionSubmitter for MockSubmitter {
    async fn submit(&self, signed: &SignedTransaction) -> Result<TransactionId, SwapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.rejection {
            return Err(err.clone());
        }
        self.submitted.lock().unwrap().push(signed.clone());
        Ok(TransactionId::from(signed.owner_signature()))
    }
}

// ---------------------------------------------------------------------------
// Raw HTTP mock backends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: Vec<u8>,
}

impl MockRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// 读取完整请求（头 + Content-Length 指定的 body）
async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = (header_end + content_length).min(buf.len());
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target, String::new()),
    };

    Some(MockRequest {
        method,
        path,
        query,
        body: buf[header_end..body_end].to_vec(),
    })
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// 可编程 mock 后端，绑定随机端口并返回地址
pub async fn start_programmable_backend<F>(handler: F) -> SocketAddr
where
    F: Fn(MockRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = handler(request);
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// 一个确定不可达的地址
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[derive(Clone, Copy)]
pub enum QuoteBehaviour {
    Ok,
    HttpError(u16),
    NotSuccess,
    Garbage,
}

/// Raydium Trade API mock
pub struct MockRaydium {
    pub addr: SocketAddr,
    pub quote_calls: Arc<AtomicUsize>,
    pub assembly_calls: Arc<AtomicUsize>,
    pub last_quote_query: Arc<Mutex<Option<String>>>,
    pub last_assembly_body: Arc<Mutex<Option<serde_json::Value>>>,
}

impl MockRaydium {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// assembly_status != 200 时组装接口返回该状态码；
/// 成功时按请求里的 wallet 构造交易，每次 blockhash 不同
pub async fn start_raydium_backend(quote: QuoteBehaviour, assembly_status: u16) -> MockRaydium {
    let quote_calls = Arc::new(AtomicUsize::new(0));
    let assembly_calls = Arc::new(AtomicUsize::new(0));
    let last_quote_query = Arc::new(Mutex::new(None));
    let last_assembly_body = Arc::new(Mutex::new(None));

    let addr = {
        let quote_calls = quote_calls.clone();
        let assembly_calls = assembly_calls.clone();
        let last_quote_query = last_quote_query.clone();
        let last_assembly_body = last_assembly_body.clone();

        start_programmable_backend(move |req| {
            if req.path == "/compute/swap-base-in" {
                quote_calls.fetch_add(1, Ordering::SeqCst);
                *last_quote_query.lock().unwrap() = Some(req.query.clone());
                return match quote {
                    QuoteBehaviour::Ok => (
                        200,
                        serde_json::json!({
                            "id": "quote-id",
                            "success": true,
                            "version": "V1",
                            "data": {"swapType": "BaseIn", "inputAmount": "100000", "outputAmount": "17000"}
                        })
                        .to_string(),
                    ),
                    QuoteBehaviour::HttpError(status) => (status, "{}".to_string()),
                    QuoteBehaviour::NotSuccess => (
                        200,
                        r#"{"id":"quote-id","success":false,"msg":"ROUTE_NOT_FOUND"}"#.to_string(),
                    ),
                    QuoteBehaviour::Garbage => (200, "<html>oops</html>".to_string()),
                };
            }

            if req.path == "/transaction/swap-base-in" && req.method == "POST" {
                let n = assembly_calls.fetch_add(1, Ordering::SeqCst) as u64;
                let body = req.json();
                *last_assembly_body.lock().unwrap() = Some(body.clone());

                if assembly_status != 200 {
                    return (assembly_status, r#"{"success":false}"#.to_string());
                }

                let wallet: Pubkey = match body["wallet"].as_str().and_then(|w| w.parse().ok()) {
                    Some(wallet) => wallet,
                    None => return (400, r#"{"success":false,"msg":"bad wallet"}"#.to_string()),
                };
                let tx = unsigned_swap_fixture(&wallet, n);
                return (
                    200,
                    serde_json::json!({
                        "id": "tx-id",
                        "version": "V1",
                        "success": true,
                        "data": [{"transaction": encode_fixture(&tx)}]
                    })
                    .to_string(),
                );
            }

            (404, "{}".to_string())
        })
        .await
    };

    MockRaydium {
        addr,
        quote_calls,
        assembly_calls,
        last_quote_query,
        last_assembly_body,
    }
}

/// Solana JSON-RPC mock
///
/// sendTransaction 回显交易里的第一个签名；rejection 非空时返回预检失败
pub async fn start_rpc_backend(rejection: Option<&'static str>) -> (SocketAddr, Arc<Mutex<Vec<VersionedTransaction>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let addr = start_programmable_backend(move |req| {
        let body = req.json();
        let id = body["id"].clone();
        let method = body["method"].as_str().unwrap_or_default();

        let reply = match method {
            "getVersion" => serde_json::json!({
                "jsonrpc": "2.0",
                "result": {"solana-core": "3.0.0", "feature-set": 1},
                "id": id,
            }),
            "sendTransaction" => {
                let decoded = body["params"][0]
                    .as_str()
                    .and_then(|b64| STANDARD.decode(b64).ok())
                    .and_then(|bytes| bincode::deserialize::<VersionedTransaction>(&bytes).ok());

                match (decoded, rejection) {
                    (Some(tx), None) => {
                        let signature = tx.signatures[0].to_string();
                        sink.lock().unwrap().push(tx);
                        serde_json::json!({"jsonrpc": "2.0", "result": signature, "id": id})
                    }
                    (Some(_), Some(reason)) => serde_json::json!({
                        "jsonrpc": "2.0",
                        "error": {"code": -32002, "message": reason},
                        "id": id,
                    }),
                    (None, _) => serde_json::json!({
                        "jsonrpc": "2.0",
                        "error": {"code": -32602, "message": "invalid transaction encoding"},
                        "id": id,
                    }),
                }
            }
            _ => serde_json::json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
                "id": id,
            }),
        };

        (200, reply.to_string())
    })
    .await;

    (addr, received)
}
