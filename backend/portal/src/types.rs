//! # Types
//!
//! Domain model of the paper registry as seen by the portal.
//!
//! ### Status as a Finite-State Machine
//!
//! [`PaperStatus`] is owned by the contract; the portal only observes it.
//!
//! ```text
//! Pending ──approve──► Published
//!    └─────reject────► Rejected
//! Removed (no transition observed from the portal)
//! ```
//!
//! Status is never mutated locally. After a write the paper is re-read from
//! the contract.

use std::fmt;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a paper, encoded on-chain as `uint8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Pending = 0,
    Published = 1,
    Rejected = 2,
    Removed = 3,
}

impl PaperStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Published),
            2 => Some(Self::Rejected),
            3 => Some(Self::Removed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paper metadata returned by `getPaperInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Contract-assigned identifier, starting at 1.
    pub id: u64,
    /// Submitting address; immutable.
    pub owner: Address,
    pub title: String,
    pub author: String,
    pub status: PaperStatus,
    /// Versions occupy indices `0..version_count`.
    pub version_count: u64,
}

/// One immutable, append-only version of a paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub paper_id: u64,
    pub index: u64,
    /// IPFS content identifier of the uploaded file.
    pub ipfs_hash: String,
    /// keccak256 digest of the file bytes.
    pub file_hash: B256,
    /// Block timestamp of the submission (unix seconds).
    pub timestamp: u64,
    /// Submitter's signature; `None` when the contract stored empty bytes.
    pub signature: Option<String>,
    /// Ids of other papers cited by this version.
    pub references: Vec<u64>,
}

/// Contract-level roles of a wallet address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub is_contract_owner: bool,
    pub is_auditor: bool,
}

impl Roles {
    pub fn is_privileged(&self) -> bool {
        self.is_contract_owner || self.is_auditor
    }
}

/// The party a visibility decision is made for.
///
/// `address == None` is the anonymous (disconnected) viewer; its roles are
/// always all-false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub address: Option<Address>,
    pub roles: Roles,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(address: Address, roles: Roles) -> Self {
        Self {
            address: Some(address),
            roles,
        }
    }

    /// A connected viewer whose roles are not (yet) known.
    pub fn unprivileged(address: Option<Address>) -> Self {
        Self {
            address,
            roles: Roles::default(),
        }
    }
}

/// Operations a viewer may perform; see [`crate::policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Approve,
    Reject,
    AddAuditor,
    RemoveAuditor,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::AddAuditor => "add_auditor",
            Self::RemoveAuditor => "remove_auditor",
        }
    }
}
