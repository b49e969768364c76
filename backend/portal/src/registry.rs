//! The paper registry seam.
//!
//! [`PaperRegistry`] is the contract surface the portal consumes. The
//! production implementation is [`crate::rpc::RpcRegistry`]; tests use an
//! in-memory double.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::Serialize;

use crate::abi::ContractWrite;
use crate::errors::Result;
use crate::types::{Paper, Version};

/// Receipt of a mined, successful transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait PaperRegistry: Send + Sync {
    /// Contract owner address.
    async fn owner(&self) -> Result<Address>;

    async fn is_auditor(&self, account: Address) -> Result<bool>;

    /// Number of papers; ids run from 1 to this value inclusive.
    async fn paper_count(&self) -> Result<u64>;

    async fn paper_info(&self, paper_id: u64) -> Result<Paper>;

    async fn version(&self, paper_id: u64, index: u64) -> Result<Version>;

    /// Accounts exposed by the wallet provider, first one is the active one.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Ask the wallet to sign `message` (EIP-191 personal message).
    async fn sign_message(&self, from: Address, message: &[u8]) -> Result<Bytes>;

    /// Submit a transaction from `from`; returns its hash without waiting.
    async fn send(&self, from: Address, call: &ContractWrite) -> Result<B256>;

    /// Wait until `tx_hash` is mined. Reverts and timeouts are errors.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt>;
}
