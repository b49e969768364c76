//! Test doubles shared by unit tests.
//!
//! [`MockRegistry`] is an in-memory [`PaperRegistry`]. Writes take effect only
//! when [`PaperRegistry::wait_for_receipt`] is called for their transaction,
//! mirroring a mined block. [`HttpStub`] serves scripted HTTP replies on a
//! loopback port for the clients that talk to real endpoints.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy_primitives::{address, Address, Bytes, B256};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::abi::ContractWrite;
use crate::errors::{PortalError, Result};
use crate::registry::{PaperRegistry, TxReceipt};
use crate::types::{Paper, PaperStatus, Version};

pub const OWNER: Address = address!("00000000000000000000000000000000000000ff");
pub const AAA: Address = address!("000000000000000000000000000000000000aaaa");
pub const BBB: Address = address!("000000000000000000000000000000000000bbbb");
pub const CCC: Address = address!("000000000000000000000000000000000000cccc");

#[derive(Default)]
struct MockState {
    owner: Address,
    auditors: HashSet<Address>,
    papers: Vec<(Paper, Vec<Version>)>,
    failing_papers: HashSet<u64>,
    fail_reads: bool,
    fail_signing: bool,
    revert_next: bool,
    accounts: Option<Vec<Address>>,
    pending: HashMap<B256, (Address, ContractWrite)>,
    sent: Vec<(Address, ContractWrite)>,
    signed: Vec<Vec<u8>>,
    block: u64,
}

pub struct MockRegistry {
    state: Mutex<MockState>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                owner: OWNER,
                accounts: Some(Vec::new()),
                ..Default::default()
            }),
        }
    }

    /// Register a paper with `versions` versions; returns its id.
    pub fn add_paper(&self, owner: Address, title: &str, status: PaperStatus, versions: u64) -> u64 {
        let mut s = self.state.lock().unwrap();
        let id = s.papers.len() as u64 + 1;
        let versions = (0..versions)
            .map(|index| version(id, index, vec![]))
            .collect::<Vec<_>>();
        s.papers.push((
            Paper {
                id,
                owner,
                title: title.to_string(),
                author: format!("author of {title}"),
                status,
                version_count: versions.len() as u64,
            },
            versions,
        ));
        id
    }

    pub fn status_of(&self, paper_id: u64) -> PaperStatus {
        self.state.lock().unwrap().papers[paper_id as usize - 1].0.status
    }

    pub fn add_auditor_now(&self, addr: Address) {
        self.state.lock().unwrap().auditors.insert(addr);
    }

    pub fn remove_auditor_now(&self, addr: Address) {
        self.state.lock().unwrap().auditors.remove(&addr);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_paper(&self, paper_id: u64) {
        self.state.lock().unwrap().failing_papers.insert(paper_id);
    }

    pub fn fail_signing(&self) {
        self.state.lock().unwrap().fail_signing = true;
    }

    /// The next awaited transaction reverts.
    pub fn revert_next(&self) {
        self.state.lock().unwrap().revert_next = true;
    }

    /// `None` makes `eth_accounts` fail (no provider).
    pub fn set_accounts(&self, accounts: Option<Vec<Address>>) {
        self.state.lock().unwrap().accounts = accounts;
    }

    /// Messages handed to the wallet for signing, in order.
    pub fn signed_messages(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().signed.clone()
    }

    pub fn sent(&self) -> Vec<(Address, ContractWrite)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn paper(&self, paper_id: u64) -> Paper {
        self.state.lock().unwrap().papers[paper_id as usize - 1].0.clone()
    }

    pub fn latest_version(&self, paper_id: u64) -> Version {
        let s = self.state.lock().unwrap();
        s.papers[paper_id as usize - 1]
            .1
            .last()
            .cloned()
            .expect("paper has versions")
    }
}

fn version(paper_id: u64, index: u64, references: Vec<u64>) -> Version {
    Version {
        paper_id,
        index,
        ipfs_hash: format!("QmPaper{paper_id}v{index}"),
        file_hash: B256::repeat_byte(index as u8),
        timestamp: 1_700_000_000 + index,
        signature: None,
        references,
    }
}

fn settle(paper: &mut Paper, status: PaperStatus) -> Result<()> {
    if paper.status != PaperStatus::Pending {
        return Err(revert("paper not pending"));
    }
    paper.status = status;
    Ok(())
}

fn unreachable_node() -> PortalError {
    PortalError::ContractCallFailed("mock node unreachable".to_string())
}

fn revert(reason: &str) -> PortalError {
    PortalError::ContractCallFailed(format!("execution reverted: {reason}"))
}

#[async_trait]
impl PaperRegistry for MockRegistry {
    async fn owner(&self) -> Result<Address> {
        let s = self.state.lock().unwrap();
        if s.fail_reads {
            return Err(unreachable_node());
        }
        Ok(s.owner)
    }

    async fn is_auditor(&self, account: Address) -> Result<bool> {
        let s = self.state.lock().unwrap();
        if s.fail_reads {
            return Err(unreachable_node());
        }
        Ok(s.auditors.contains(&account))
    }

    async fn paper_count(&self) -> Result<u64> {
        let s = self.state.lock().unwrap();
        if s.fail_reads {
            return Err(unreachable_node());
        }
        Ok(s.papers.len() as u64)
    }

    async fn paper_info(&self, paper_id: u64) -> Result<Paper> {
        let s = self.state.lock().unwrap();
        if s.fail_reads || s.failing_papers.contains(&paper_id) {
            return Err(unreachable_node());
        }
        paper_id
            .checked_sub(1)
            .and_then(|i| s.papers.get(i as usize))
            .map(|(p, _)| p.clone())
            .ok_or_else(|| revert("invalid paper"))
    }

    async fn version(&self, paper_id: u64, index: u64) -> Result<Version> {
        let s = self.state.lock().unwrap();
        if s.fail_reads || s.failing_papers.contains(&paper_id) {
            return Err(unreachable_node());
        }
        paper_id
            .checked_sub(1)
            .and_then(|i| s.papers.get(i as usize))
            .and_then(|(_, versions)| versions.get(index as usize))
            .cloned()
            .ok_or_else(|| revert("invalid version"))
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .clone()
            .ok_or_else(unreachable_node)
    }

    async fn sign_message(&self, _from: Address, message: &[u8]) -> Result<Bytes> {
        let mut s = self.state.lock().unwrap();
        s.signed.push(message.to_vec());
        if s.fail_signing {
            return Err(PortalError::ContractCallFailed("user rejected signing".to_string()));
        }
        Ok(Bytes::from(vec![0x5a; 65]))
    }

    async fn send(&self, from: Address, call: &ContractWrite) -> Result<B256> {
        let mut s = self.state.lock().unwrap();
        s.sent.push((from, call.clone()));
        let hash = B256::with_last_byte(s.sent.len() as u8);
        s.pending.insert(hash, (from, call.clone()));
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        let mut s = self.state.lock().unwrap();
        let (from, call) = s
            .pending
            .remove(&tx_hash)
            .ok_or_else(|| revert("unknown transaction"))?;
        if std::mem::take(&mut s.revert_next) {
            return Err(revert("mock revert"));
        }

        match call {
            ContractWrite::ApprovePaper(id) => {
                settle(&mut s.papers[id as usize - 1].0, PaperStatus::Published)?;
            }
            ContractWrite::RejectPaper(id) => {
                settle(&mut s.papers[id as usize - 1].0, PaperStatus::Rejected)?;
            }
            ContractWrite::AddAuditor(addr) => {
                s.auditors.insert(addr);
            }
            ContractWrite::RemoveAuditor(addr) => {
                s.auditors.remove(&addr);
            }
            ContractWrite::SubmitPaper {
                title,
                author,
                ipfs_hash,
                file_hash,
                references,
                ..
            } => {
                let id = s.papers.len() as u64 + 1;
                let mut v = version(id, 0, references);
                v.ipfs_hash = ipfs_hash;
                v.file_hash = file_hash;
                s.papers.push((
                    Paper {
                        id,
                        owner: from,
                        title,
                        author,
                        status: PaperStatus::Pending,
                        version_count: 1,
                    },
                    vec![v],
                ));
            }
            ContractWrite::AddVersion {
                paper_id,
                ipfs_hash,
                file_hash,
                references,
                ..
            } => {
                let entry = &mut s.papers[paper_id as usize - 1];
                let mut v = version(paper_id, entry.1.len() as u64, references);
                v.ipfs_hash = ipfs_hash;
                v.file_hash = file_hash;
                entry.1.push(v);
                entry.0.version_count += 1;
            }
        }

        s.block += 1;
        Ok(TxReceipt {
            tx_hash,
            block_number: Some(s.block),
        })
    }
}

// ─────────────────────────────────────────────────────────
// Loopback HTTP stub
// ─────────────────────────────────────────────────────────

/// One scripted answer: `None` drops the connection after reading the request.
pub type StubReply = Option<(u16, String)>;

/// Serves one scripted reply per connection; the last reply repeats once the
/// script runs out. Every request body is recorded.
pub struct HttpStub {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl HttpStub {
    pub async fn start(replies: Vec<StubReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            let mut served = 0;
            while let Ok((mut stream, _)) = listener.accept().await {
                let body = read_request(&mut stream).await;
                seen.lock().unwrap().push(body);
                let reply = replies.get(served).or(replies.last()).cloned().flatten();
                served += 1;

                let Some((status, body)) = reply else {
                    continue;
                };
                let response = format!(
                    "HTTP/1.1 {status} STUB\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { url, requests }
    }

    /// Bodies of the requests received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body = &buf[end + 4..];
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let complete = match length {
                Some(length) => body.len() >= length,
                None if head.contains("transfer-encoding: chunked") => {
                    body.ends_with(b"0\r\n\r\n")
                }
                None => true,
            };
            if complete {
                return String::from_utf8_lossy(body).into_owned();
            }
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}
