//! Role resolution: wallet address → contract roles.

use std::sync::Arc;

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::registry::PaperRegistry;
use crate::types::Roles;

/// Outcome of a role check.
///
/// A failed check still yields usable (all-false) roles; `failure` carries
/// the message the UI shows as "permission check failed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCheck {
    pub address: Option<Address>,
    pub roles: Roles,
    pub failure: Option<String>,
}

#[derive(Clone)]
pub struct RoleResolver {
    registry: Arc<dyn PaperRegistry>,
}

impl RoleResolver {
    pub fn new(registry: Arc<dyn PaperRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve roles for `address`. Never cached: each call re-reads the
    /// contract, so an account switch can never observe another account's roles.
    pub async fn resolve(&self, address: Option<Address>) -> RoleCheck {
        let Some(addr) = address else {
            return RoleCheck {
                address: None,
                roles: Roles::default(),
                failure: None,
            };
        };

        match self.query(addr).await {
            Ok(roles) => {
                debug!(address = %addr, ?roles, "Resolved roles");
                RoleCheck {
                    address: Some(addr),
                    roles,
                    failure: None,
                }
            }
            Err(e) => {
                warn!("Permission check failed for {addr}: {e}");
                RoleCheck {
                    address: Some(addr),
                    roles: Roles::default(),
                    failure: Some(format!("permission check failed: {e}")),
                }
            }
        }
    }

    async fn query(&self, addr: Address) -> Result<Roles> {
        let owner = self.registry.owner().await?;
        let is_auditor = self.registry.is_auditor(addr).await?;
        Ok(Roles {
            is_contract_owner: owner == addr,
            is_auditor,
        })
    }
}
