//! Long-running background task that follows the wallet provider's active
//! account and keeps the session's roles fresh.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::registry::PaperRegistry;
use crate::roles::RoleResolver;
use crate::session::WalletSession;

pub struct WalletWatcher {
    pub registry: Arc<dyn PaperRegistry>,
    pub resolver: RoleResolver,
    pub session: Arc<WalletSession>,
    /// Fixed account from configuration; `eth_accounts` is ignored when set.
    pub pinned: Option<Address>,
    pub poll_interval: Duration,
}

/// Poll until `shutdown` is cancelled.
pub async fn run(watcher: Arc<WalletWatcher>, shutdown: CancellationToken) {
    info!(
        "Wallet watcher starting ({})",
        match watcher.pinned {
            Some(addr) => format!("pinned account {addr}"),
            None => "following eth_accounts".to_string(),
        }
    );

    loop {
        poll_once(&watcher).await;

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Wallet watcher stopped");
                return;
            }
            _ = tokio::time::sleep(watcher.poll_interval) => {}
        }
    }
}

/// One watcher iteration: detect the active account, then re-resolve roles.
pub async fn poll_once(watcher: &WalletWatcher) {
    let account = match watcher.pinned {
        Some(addr) => Some(addr),
        None => match watcher.registry.accounts().await {
            Ok(accounts) => accounts.first().copied(),
            Err(e) => {
                warn!("Wallet provider unavailable: {e}");
                None
            }
        },
    };

    let ticket = watcher.session.switch_account(account);
    let check = watcher.resolver.resolve(ticket.account()).await;
    if !watcher.session.apply(ticket, &check) {
        info!("Account switched while resolving roles; result discarded");
    }
}
