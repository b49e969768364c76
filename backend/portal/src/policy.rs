//! Paper visibility and action policy.
//!
//! Every read and write surface in the portal asks this module, and only this
//! module, what a viewer may see or do. The functions are pure: they take the
//! paper status, the viewer and the paper-ownership flag and never touch the
//! network.
//!
//! | Status    | Visible to                          | Paper actions            |
//! |-----------|-------------------------------------|--------------------------|
//! | Published | everyone                            | `View`                   |
//! | Pending   | paper owner, auditor, contract owner| `View` (+ `Approve`, `Reject` for a non-owner auditor / contract owner) |
//! | Rejected  | paper owner, auditor, contract owner| `View`                   |
//! | Removed   | paper owner, auditor, contract owner| `View`                   |
//!
//! `AddAuditor` / `RemoveAuditor` are granted to the contract owner only,
//! whatever the paper status.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::{Action, Paper, PaperStatus, Viewer};

/// True when the connected viewer submitted `paper`.
pub fn is_paper_owner(paper: &Paper, viewer: &Viewer) -> bool {
    viewer.address.is_some_and(|addr| addr == paper.owner)
}

pub fn is_visible(status: PaperStatus, viewer: &Viewer, is_paper_owner: bool) -> bool {
    match status {
        PaperStatus::Published => true,
        // Removed follows the Rejected rule; no portal path produces it.
        PaperStatus::Pending | PaperStatus::Rejected | PaperStatus::Removed => {
            is_paper_owner || viewer.roles.is_auditor || viewer.roles.is_contract_owner
        }
    }
}

/// Actions on the auditor set; independent of any paper.
pub fn auditor_actions(viewer: &Viewer) -> BTreeSet<Action> {
    if viewer.roles.is_contract_owner {
        BTreeSet::from([Action::AddAuditor, Action::RemoveAuditor])
    } else {
        BTreeSet::new()
    }
}

pub fn allowed_actions(status: PaperStatus, viewer: &Viewer, is_paper_owner: bool) -> BTreeSet<Action> {
    let mut actions = auditor_actions(viewer);
    if !is_visible(status, viewer, is_paper_owner) {
        return actions;
    }

    actions.insert(Action::View);

    let reviewer = viewer.roles.is_auditor || viewer.roles.is_contract_owner;
    // No self-review, even for an owner who is also an auditor.
    if status == PaperStatus::Pending && reviewer && !is_paper_owner {
        actions.insert(Action::Approve);
        actions.insert(Action::Reject);
    }

    actions
}

/// Flattened view of [`allowed_actions`] for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperAccess {
    pub visible: bool,
    pub is_paper_owner: bool,
    pub can_approve: bool,
    pub can_reject: bool,
    pub can_manage_auditors: bool,
    pub actions: BTreeSet<Action>,
}

impl PaperAccess {
    pub fn evaluate(paper: &Paper, viewer: &Viewer) -> Self {
        let owner = is_paper_owner(paper, viewer);
        let actions = allowed_actions(paper.status, viewer, owner);
        Self {
            visible: actions.contains(&Action::View),
            is_paper_owner: owner,
            can_approve: actions.contains(&Action::Approve),
            can_reject: actions.contains(&Action::Reject),
            can_manage_auditors: actions.contains(&Action::AddAuditor),
            actions,
        }
    }

    pub fn permits(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}
