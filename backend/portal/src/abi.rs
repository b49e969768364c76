//! Solidity ABI bindings for the paper registry contract.
//!
//! Calls are encoded into `eth_call` / `eth_sendTransaction` payloads and
//! return data is decoded into the portal's domain [`types`](crate::types).

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};

use crate::errors::{PortalError, Result};
use crate::types::{Paper, PaperStatus, Version};

sol! {
    function owner() external view returns (address);
    function auditors(address account) external view returns (bool);
    function paperCount() external view returns (uint256);
    function getPaperInfo(uint256 paperId) external view returns (
        address owner,
        string title,
        string author,
        uint8 status,
        uint256 versionCount
    );
    function getVersion(uint256 paperId, uint256 index) external view returns (
        string ipfsHash,
        bytes32 fileHash,
        uint256 timestamp,
        bytes signature,
        uint256[] refs
    );
    function submitPaper(
        string title,
        string author,
        string ipfsHash,
        bytes32 fileHash,
        bytes signature,
        uint256[] refs
    ) external;
    function addVersion(
        uint256 paperId,
        string ipfsHash,
        bytes32 fileHash,
        bytes signature,
        uint256[] refs
    ) external;
    function approvePaper(uint256 paperId) external;
    function rejectPaper(uint256 paperId) external;
    function addAuditor(address auditor) external;
    function removeAuditor(address auditor) external;
}

/// Payload of a state-changing contract call, ready for `eth_sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractWrite {
    SubmitPaper {
        title: String,
        author: String,
        ipfs_hash: String,
        file_hash: B256,
        signature: Bytes,
        references: Vec<u64>,
    },
    AddVersion {
        paper_id: u64,
        ipfs_hash: String,
        file_hash: B256,
        signature: Bytes,
        references: Vec<u64>,
    },
    ApprovePaper(u64),
    RejectPaper(u64),
    AddAuditor(Address),
    RemoveAuditor(Address),
}

impl ContractWrite {
    pub fn method(&self) -> &'static str {
        match self {
            Self::SubmitPaper { .. } => "submitPaper",
            Self::AddVersion { .. } => "addVersion",
            Self::ApprovePaper(_) => "approvePaper",
            Self::RejectPaper(_) => "rejectPaper",
            Self::AddAuditor(_) => "addAuditor",
            Self::RemoveAuditor(_) => "removeAuditor",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::SubmitPaper {
                title,
                author,
                ipfs_hash,
                file_hash,
                signature,
                references,
            } => submitPaperCall {
                title: title.clone(),
                author: author.clone(),
                ipfsHash: ipfs_hash.clone(),
                fileHash: *file_hash,
                signature: signature.clone(),
                refs: to_uint_vec(references),
            }
            .abi_encode(),
            Self::AddVersion {
                paper_id,
                ipfs_hash,
                file_hash,
                signature,
                references,
            } => addVersionCall {
                paperId: U256::from(*paper_id),
                ipfsHash: ipfs_hash.clone(),
                fileHash: *file_hash,
                signature: signature.clone(),
                refs: to_uint_vec(references),
            }
            .abi_encode(),
            Self::ApprovePaper(id) => approvePaperCall {
                paperId: U256::from(*id),
            }
            .abi_encode(),
            Self::RejectPaper(id) => rejectPaperCall {
                paperId: U256::from(*id),
            }
            .abi_encode(),
            Self::AddAuditor(addr) => addAuditorCall { auditor: *addr }.abi_encode(),
            Self::RemoveAuditor(addr) => removeAuditorCall { auditor: *addr }.abi_encode(),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Read calls
// ─────────────────────────────────────────────────────────

pub fn encode_owner() -> Vec<u8> {
    ownerCall {}.abi_encode()
}

pub fn decode_owner(data: &[u8]) -> Result<Address> {
    Ok(ownerCall::abi_decode_returns(data, true)
        .map_err(|e| decode_error("owner", e))?
        ._0)
}

pub fn encode_auditors(account: Address) -> Vec<u8> {
    auditorsCall { account }.abi_encode()
}

pub fn decode_auditors(data: &[u8]) -> Result<bool> {
    Ok(auditorsCall::abi_decode_returns(data, true)
        .map_err(|e| decode_error("auditors", e))?
        ._0)
}

pub fn encode_paper_count() -> Vec<u8> {
    paperCountCall {}.abi_encode()
}

pub fn decode_paper_count(data: &[u8]) -> Result<u64> {
    let ret = paperCountCall::abi_decode_returns(data, true)
        .map_err(|e| decode_error("paperCount", e))?;
    to_u64(ret._0, "paperCount")
}

pub fn encode_paper_info(paper_id: u64) -> Vec<u8> {
    getPaperInfoCall {
        paperId: U256::from(paper_id),
    }
    .abi_encode()
}

pub fn decode_paper_info(paper_id: u64, data: &[u8]) -> Result<Paper> {
    let ret = getPaperInfoCall::abi_decode_returns(data, true)
        .map_err(|e| decode_error("getPaperInfo", e))?;
    let status = PaperStatus::from_code(ret.status).ok_or_else(|| {
        PortalError::ContractCallFailed(format!(
            "paper {paper_id} has unknown status code {}",
            ret.status
        ))
    })?;
    Ok(Paper {
        id: paper_id,
        owner: ret.owner,
        title: ret.title,
        author: ret.author,
        status,
        version_count: to_u64(ret.versionCount, "versionCount")?,
    })
}

pub fn encode_version(paper_id: u64, index: u64) -> Vec<u8> {
    getVersionCall {
        paperId: U256::from(paper_id),
        index: U256::from(index),
    }
    .abi_encode()
}

pub fn decode_version(paper_id: u64, index: u64, data: &[u8]) -> Result<Version> {
    let ret = getVersionCall::abi_decode_returns(data, true)
        .map_err(|e| decode_error("getVersion", e))?;
    let references = ret
        .refs
        .into_iter()
        .map(|r| to_u64(r, "reference id"))
        .collect::<Result<Vec<_>>>()?;
    Ok(Version {
        paper_id,
        index,
        ipfs_hash: ret.ipfsHash,
        file_hash: ret.fileHash,
        timestamp: to_u64(ret.timestamp, "timestamp")?,
        signature: (!ret.signature.is_empty()).then(|| ret.signature.to_string()),
        references,
    })
}

// ─────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────

fn to_uint_vec(ids: &[u64]) -> Vec<U256> {
    ids.iter().map(|id| U256::from(*id)).collect()
}

fn to_u64(value: U256, what: &str) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(PortalError::ContractCallFailed(format!(
            "{what} does not fit in 64 bits: {value}"
        )));
    }
    Ok(value.as_limbs()[0])
}

fn decode_error(method: &str, err: alloy_sol_types::Error) -> PortalError {
    PortalError::ContractCallFailed(format!("could not decode {method} return data: {err}"))
}
