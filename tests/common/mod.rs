//! Shared utilities for integration testing.
#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use photo_attest::anchor::LedgerAnchorClient;
use photo_attest::blockchain::{BlockchainError, BlockchainResult, ConfirmationSource, ConfirmationStatus};
use photo_attest::config::UploadConfig;
use photo_attest::identity::{IdentityProvider, WalletError};
use photo_attest::pipeline::{AttestationPipeline, StaticChallenge};
use photo_attest::upload::UploadClient;

/// Anvil's first well-known development key.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn contract() -> Address {
    Address::repeat_byte(0xcc)
}

pub fn submitted_tx() -> TxHash {
    TxHash::repeat_byte(0x42)
}

/// Small JPEG-typed payload; content is irrelevant to the pipeline.
pub fn jpeg(len: usize) -> photo_attest::CapturedImage {
    photo_attest::CapturedImage::new(vec![0xffu8; len], "image/jpeg").unwrap()
}

// ---------------------------------------------------------------------------
// Storage backend
// ---------------------------------------------------------------------------

/// A request as seen by the mock storage backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether the multipart body carries text field `name` = `value`.
    pub fn has_form_field(&self, name: &str, value: &str) -> bool {
        self.body_text()
            .contains(&format!("name=\"{}\"\r\n\r\n{}\r\n", name, value))
    }

    pub fn has_form_name(&self, name: &str) -> bool {
        self.body_text().contains(&format!("name=\"{}\"", name))
    }
}

/// How the mock answers one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn stored(id: u64, file_path: &str) -> Self {
        Self::json(
            201,
            &format!(
                r#"{{"message":"Photo uploaded successfully","photo":{{"id":{},"file_name":"photo.jpeg","file_path":"{}","mime_type":"image/jpeg","file_size":3}}}}"#,
                id, file_path
            ),
        )
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Programmable storage backend on an ephemeral port.
pub struct MockStorage {
    pub base_url: String,
    hits: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockStorage {
    /// Answer every request through `responder`.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&CapturedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder = Arc::new(responder);

        let (h, r) = (hits.clone(), requests.clone());
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let (h, r, responder) = (h.clone(), r.clone(), responder.clone());
                        tokio::spawn(async move {
                            serve(socket, h, r, move |req| responder(req)).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            base_url: format!("http://{}/api", addr),
            hits,
            requests,
        }
    }

    /// Answer every request with `reply`.
    pub async fn always(reply: Reply) -> Self {
        Self::start(move |_| reply.clone()).await
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn client(&self) -> UploadClient {
        let config = UploadConfig {
            base_url: self.base_url.clone(),
            ..UploadConfig::default()
        };
        UploadClient::new(&config).unwrap()
    }
}

async fn serve<F>(
    mut socket: TcpStream,
    hits: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responder: F,
) where
    F: Fn(&CapturedRequest) -> Reply,
{
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    hits.fetch_add(1, Ordering::SeqCst);
    requests.lock().unwrap().push(request.clone());

    let reply = responder(&request);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason_phrase(reply.status),
        reply.body.len(),
        reply.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok());
    let chunked = headers
        .iter()
        .any(|(k, v)| k == "transfer-encoding" && v.eq_ignore_ascii_case("chunked"));

    let mut body = buf[header_end..].to_vec();
    if let Some(len) = content_length {
        while body.len() < len {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    } else if chunked {
        while find(&body, b"0\r\n\r\n").is_none() {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    }

    Some(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Scriptable identity backed by a real key.
pub struct MockIdentity {
    signer: PrivateKeySigner,
    connected: AtomicBool,
    switched: AtomicBool,
    reject_sign: AtomicBool,
    reject_submit: AtomicBool,
    switch_after_sign: AtomicBool,
    sign_gate: Option<Arc<Notify>>,
    pub sign_calls: AtomicU32,
    pub submit_calls: AtomicU32,
    pub submitted: Mutex<Vec<TransactionRequest>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self {
            signer: TEST_PRIVATE_KEY.parse().unwrap(),
            connected: AtomicBool::new(true),
            switched: AtomicBool::new(false),
            reject_sign: AtomicBool::new(false),
            reject_submit: AtomicBool::new(false),
            switch_after_sign: AtomicBool::new(false),
            sign_gate: None,
            sign_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        let identity = Self::new();
        identity.connected.store(false, Ordering::SeqCst);
        identity
    }

    /// Signing waits until `gate` is notified.
    pub fn with_sign_gate(mut self, gate: Arc<Notify>) -> Self {
        self.sign_gate = Some(gate);
        self
    }

    pub fn reject_signing(self) -> Self {
        self.reject_sign.store(true, Ordering::SeqCst);
        self
    }

    pub fn reject_submission(self) -> Self {
        self.reject_submit.store(true, Ordering::SeqCst);
        self
    }

    /// Report a different account once a signature has been produced.
    pub fn switch_account_after_signing(self) -> Self {
        self.switch_after_sign.store(true, Ordering::SeqCst);
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn sign_count(&self) -> u32 {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    fn current_identity(&self) -> Option<Address> {
        if !self.connected.load(Ordering::SeqCst) {
            return None;
        }
        if self.switched.load(Ordering::SeqCst) {
            return Some(Address::repeat_byte(0x77));
        }
        Some(self.signer.address())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, WalletError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.sign_gate {
            gate.notified().await;
        }
        if self.reject_sign.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected("User denied message signature".to_string()));
        }
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| WalletError::Rejected(e.to_string()))?;
        if self.switch_after_sign.load(Ordering::SeqCst) {
            self.switched.store(true, Ordering::SeqCst);
        }
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    async fn submit_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(tx);
        if self.reject_submit.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected("User denied transaction signature".to_string()));
        }
        Ok(submitted_tx())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Confirmation source answering from a script.
pub struct MockLedger {
    outcome: Result<ConfirmationStatus, String>,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicU32,
}

impl MockLedger {
    pub fn confirming() -> Self {
        Self::answering(Ok(ConfirmationStatus::Confirmed {
            block_number: 7,
            confirmations: 1,
        }))
    }

    pub fn reverting() -> Self {
        Self::answering(Ok(ConfirmationStatus::Failed {
            reason: "transaction reverted".to_string(),
        }))
    }

    pub fn timing_out() -> Self {
        Self::answering(Err("Transaction not confirmed within 300 seconds".to_string()))
    }

    fn answering(outcome: Result<ConfirmationStatus, String>) -> Self {
        Self {
            outcome,
            gate: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Confirmation waits until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmationSource for MockLedger {
    async fn await_confirmation(&self, _tx_hash: TxHash) -> BlockchainResult<ConfirmationStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone().map_err(BlockchainError::Rpc)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub fn pipeline(
    uploader: UploadClient,
    identity: Arc<MockIdentity>,
    ledger: Arc<MockLedger>,
) -> AttestationPipeline {
    let anchor = LedgerAnchorClient::new(identity.clone(), ledger, contract());
    AttestationPipeline::new(
        identity,
        uploader,
        anchor,
        Arc::new(StaticChallenge::new("photo-attest-v1")),
    )
}

/// Poll until `poll` returns true, panicking after five seconds.
pub async fn wait_for<F, Fut>(mut poll: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !poll().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
