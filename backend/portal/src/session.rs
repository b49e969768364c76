//! Wallet session: the explicit context holding the connected account and
//! its resolved roles.
//!
//! Every account switch bumps an epoch. Work started for one epoch carries a
//! [`SessionTicket`]; when the result comes back after the account changed,
//! the ticket no longer matches and the result is dropped. Until roles for the
//! current account are known, [`WalletSession::viewer`] reports no privileged
//! access.

use std::sync::RwLock;

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{debug, info};

use crate::roles::{RoleCheck, RoleResolver};
use crate::types::{Roles, Viewer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoleState {
    Resolving,
    Resolved { roles: Roles },
    Failed { message: String },
}

/// Identity of the context a piece of async work was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTicket {
    epoch: u64,
    account: Option<Address>,
}

impl SessionTicket {
    pub fn account(&self) -> Option<Address> {
        self.account
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub account: Option<Address>,
    pub epoch: u64,
    pub roles: RoleState,
    pub viewer: Viewer,
}

struct SessionState {
    account: Option<Address>,
    epoch: u64,
    roles: RoleState,
}

pub struct WalletSession {
    inner: RwLock<SessionState>,
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletSession {
    /// A disconnected session.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SessionState {
                account: None,
                epoch: 0,
                roles: RoleState::Resolved {
                    roles: Roles::default(),
                },
            }),
        }
    }

    /// Point the session at `account`. Switching to a different account
    /// invalidates outstanding tickets and resets roles to `Resolving`.
    pub fn switch_account(&self, account: Option<Address>) -> SessionTicket {
        let mut s = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if s.account != account {
            info!("Wallet account changed: {:?} -> {:?}", s.account, account);
            s.account = account;
            s.epoch += 1;
            s.roles = RoleState::Resolving;
        }
        SessionTicket {
            epoch: s.epoch,
            account: s.account,
        }
    }

    pub fn ticket(&self) -> SessionTicket {
        let s = self.inner.read().unwrap_or_else(|e| e.into_inner());
        SessionTicket {
            epoch: s.epoch,
            account: s.account,
        }
    }

    pub fn is_current(&self, ticket: SessionTicket) -> bool {
        self.ticket() == ticket
    }

    /// Store a role check if it still belongs to the current context.
    /// Returns `false` when the result was stale and dropped.
    pub fn apply(&self, ticket: SessionTicket, check: &RoleCheck) -> bool {
        let mut s = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if s.epoch != ticket.epoch || s.account != ticket.account || check.address != s.account {
            debug!(
                ticket_epoch = ticket.epoch,
                current_epoch = s.epoch,
                "Discarding stale role check"
            );
            return false;
        }
        s.roles = match &check.failure {
            Some(message) => RoleState::Failed {
                message: message.clone(),
            },
            None => RoleState::Resolved { roles: check.roles },
        };
        true
    }

    /// The viewer for visibility decisions. Roles count only when resolved
    /// for the current account.
    pub fn viewer(&self) -> Viewer {
        let s = self.inner.read().unwrap_or_else(|e| e.into_inner());
        match (&s.roles, s.account) {
            (RoleState::Resolved { roles }, Some(addr)) => Viewer::new(addr, *roles),
            _ => Viewer::unprivileged(s.account),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let viewer = self.viewer();
        let s = self.inner.read().unwrap_or_else(|e| e.into_inner());
        SessionSnapshot {
            account: s.account,
            epoch: s.epoch,
            roles: s.roles.clone(),
            viewer,
        }
    }

    /// Re-resolve roles for the current account and apply them if the
    /// account did not change meanwhile.
    pub async fn refresh(&self, resolver: &RoleResolver) -> RoleCheck {
        let ticket = self.ticket();
        let check = resolver.resolve(ticket.account).await;
        self.apply(ticket, &check);
        check
    }
}
