//! Write side: review actions, auditor management and submissions.
//!
//! Every flow re-checks the policy against freshly read contract state, journals
//! the transaction, waits for its receipt and then reads the paper back. Local
//! state is never updated optimistically; whatever the contract reports after
//! confirmation is what the caller sees.

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::abi::ContractWrite;
use crate::aggregator::{Aggregator, PaperView};
use crate::db::{self, NewAction};
use crate::errors::{PortalError, Result};
use crate::ipfs::{file_digest, ContentStore};
use crate::policy::{auditor_actions, PaperAccess};
use crate::registry::{PaperRegistry, TxReceipt};
use crate::roles::{RoleCheck, RoleResolver};
use crate::session::{SessionSnapshot, SessionTicket, WalletSession};
use crate::types::{Action, Viewer};

/// A new paper as uploaded by its author.
#[derive(Debug, Clone)]
pub struct SubmitPaper {
    pub title: String,
    pub author: String,
    pub file_name: String,
    pub content: Vec<u8>,
    /// Comma-separated ids of cited papers.
    pub references: String,
}

#[derive(Debug, Clone)]
pub struct AddVersion {
    pub file_name: String,
    pub content: Vec<u8>,
    pub references: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaperOutcome {
    pub receipt: TxReceipt,
    /// The paper as read back after confirmation; `None` when the current
    /// account may not see it.
    pub paper: Option<PaperView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditorOutcome {
    pub receipt: TxReceipt,
    pub target: RoleCheck,
    pub session: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub receipt: TxReceipt,
    pub ipfs_hash: String,
    pub gateway_url: String,
    pub file_hash: B256,
    pub signed: bool,
    pub paper: Option<PaperView>,
}

pub struct Dispatcher {
    registry: Arc<dyn PaperRegistry>,
    aggregator: Aggregator,
    resolver: RoleResolver,
    session: Arc<WalletSession>,
    store: Arc<dyn ContentStore>,
    pool: SqlitePool,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn PaperRegistry>,
        session: Arc<WalletSession>,
        store: Arc<dyn ContentStore>,
        pool: SqlitePool,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(registry.clone()),
            resolver: RoleResolver::new(registry.clone()),
            registry,
            session,
            store,
            pool,
        }
    }

    // ─────────────────────────────────────────────────────────
    // Review
    // ─────────────────────────────────────────────────────────

    pub async fn approve(&self, paper_id: u64) -> Result<PaperOutcome> {
        self.review(paper_id, Action::Approve, ContractWrite::ApprovePaper(paper_id))
            .await
    }

    pub async fn reject(&self, paper_id: u64) -> Result<PaperOutcome> {
        self.review(paper_id, Action::Reject, ContractWrite::RejectPaper(paper_id))
            .await
    }

    async fn review(
        &self,
        paper_id: u64,
        action: Action,
        call: ContractWrite,
    ) -> Result<PaperOutcome> {
        let ticket = self.session.ticket();
        let viewer = self.session.viewer();
        let from = connected(&viewer)?;

        let paper = self.aggregator.fetch_paper(paper_id).await?;
        let access = PaperAccess::evaluate(&paper, &viewer);
        if !access.permits(action) {
            return Err(PortalError::PermissionDenied(format!(
                "{from} may not {} paper {paper_id} ({})",
                action.as_str(),
                paper.status
            )));
        }

        let receipt = self.execute(from, Some(paper_id), None, &call).await?;
        let paper = self.read_back(paper_id, ticket).await?;
        Ok(PaperOutcome { receipt, paper })
    }

    // ─────────────────────────────────────────────────────────
    // Auditor management
    // ─────────────────────────────────────────────────────────

    pub async fn add_auditor(&self, target: Address) -> Result<AuditorOutcome> {
        self.manage_auditor(target, Action::AddAuditor, ContractWrite::AddAuditor(target))
            .await
    }

    pub async fn remove_auditor(&self, target: Address) -> Result<AuditorOutcome> {
        self.manage_auditor(target, Action::RemoveAuditor, ContractWrite::RemoveAuditor(target))
            .await
    }

    async fn manage_auditor(
        &self,
        target: Address,
        action: Action,
        call: ContractWrite,
    ) -> Result<AuditorOutcome> {
        let viewer = self.session.viewer();
        let from = connected(&viewer)?;
        if target.is_zero() {
            return Err(PortalError::InvalidInput("auditor address is the zero address".to_string()));
        }
        if !auditor_actions(&viewer).contains(&action) {
            return Err(PortalError::PermissionDenied(
                "only the contract owner can manage auditors".to_string(),
            ));
        }

        let receipt = self.execute(from, None, Some(target), &call).await?;

        // The owner may have changed their own auditor flag.
        self.session.refresh(&self.resolver).await;
        let target = self.resolver.resolve(Some(target)).await;
        Ok(AuditorOutcome {
            receipt,
            target,
            session: self.session.snapshot(),
        })
    }

    // ─────────────────────────────────────────────────────────
    // Submissions
    // ─────────────────────────────────────────────────────────

    pub async fn submit_paper(&self, req: SubmitPaper) -> Result<UploadOutcome> {
        let ticket = self.session.ticket();
        let from = connected(&self.session.viewer())?;
        let title = required("title", &req.title)?.to_string();
        let author = required("author", &req.author)?.to_string();
        let references = parse_references(&req.references);

        let file_hash = file_digest(&req.content);
        let ipfs_hash = self.store.upload(&req.file_name, req.content).await?;
        let signature = self
            .sign_or_empty(from, submission_digest(&title, &author, &ipfs_hash))
            .await;
        let signed = !signature.is_empty();

        let call = ContractWrite::SubmitPaper {
            title,
            author,
            ipfs_hash: ipfs_hash.clone(),
            file_hash,
            signature,
            references,
        };
        let receipt = self.execute(from, None, None, &call).await?;
        let paper = self.latest_submission(from, ticket).await;

        Ok(UploadOutcome {
            receipt,
            gateway_url: self.store.gateway_url(&ipfs_hash),
            ipfs_hash,
            file_hash,
            signed,
            paper,
        })
    }

    pub async fn add_version(&self, paper_id: u64, req: AddVersion) -> Result<UploadOutcome> {
        let ticket = self.session.ticket();
        let viewer = self.session.viewer();
        let from = connected(&viewer)?;
        // Ownership is the contract's call; the portal only refuses hidden papers.
        self.aggregator.paper(paper_id, &viewer).await?;
        let references = parse_references(&req.references);

        let file_hash = file_digest(&req.content);
        let ipfs_hash = self.store.upload(&req.file_name, req.content).await?;
        let signature = self
            .sign_or_empty(from, version_digest(paper_id, &ipfs_hash))
            .await;
        let signed = !signature.is_empty();

        let call = ContractWrite::AddVersion {
            paper_id,
            ipfs_hash: ipfs_hash.clone(),
            file_hash,
            signature,
            references,
        };
        let receipt = self.execute(from, Some(paper_id), None, &call).await?;
        let paper = self.read_back(paper_id, ticket).await?;

        Ok(UploadOutcome {
            receipt,
            gateway_url: self.store.gateway_url(&ipfs_hash),
            ipfs_hash,
            file_hash,
            signed,
            paper,
        })
    }

    // ─────────────────────────────────────────────────────────
    // Shared steps
    // ─────────────────────────────────────────────────────────

    /// Journal, send and await `call`.
    async fn execute(
        &self,
        from: Address,
        paper_id: Option<u64>,
        target: Option<Address>,
        call: &ContractWrite,
    ) -> Result<TxReceipt> {
        let method = call.method();
        let id = db::record_action(
            &self.pool,
            &NewAction {
                action: method,
                paper_id,
                target: target.map(|a| a.to_string()),
                actor: from.to_string(),
            },
        )
        .await?;

        let tx_hash = match self.registry.send(from, call).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!("{method} from {from} was not accepted: {e}");
                db::mark_failed(&self.pool, id, &e.to_string()).await?;
                return Err(e);
            }
        };
        db::mark_pending(&self.pool, id, &tx_hash.to_string()).await?;
        info!("{method} sent from {from}: {tx_hash}");

        match self.registry.wait_for_receipt(tx_hash).await {
            Ok(receipt) => {
                db::mark_confirmed(&self.pool, id).await?;
                info!(
                    "{method} confirmed in block {}",
                    receipt
                        .block_number
                        .map(|b| b.to_string())
                        .unwrap_or_else(|| "?".to_string())
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!("{method} {tx_hash} failed: {e}");
                db::mark_failed(&self.pool, id, &e.to_string()).await?;
                Err(e)
            }
        }
    }

    /// Re-read `paper_id` and evaluate it for whoever is connected now.
    async fn read_back(&self, paper_id: u64, ticket: SessionTicket) -> Result<Option<PaperView>> {
        if !self.session.is_current(ticket) {
            info!("Account switched while paper {paper_id} was in flight; reading it for the new account");
        }
        let viewer = self.session.viewer();
        let view = PaperView::new(self.aggregator.fetch_paper(paper_id).await?, &viewer);
        Ok(view.access.visible.then_some(view))
    }

    /// The newest paper, if `from` submitted it. A failed read here does not
    /// undo a confirmed submission, so it only logs.
    async fn latest_submission(&self, from: Address, ticket: SessionTicket) -> Option<PaperView> {
        let lookup = async {
            let id = self.registry.paper_count().await?;
            let paper = self.registry.paper_info(id).await?;
            Ok::<_, PortalError>(paper)
        };
        match lookup.await {
            Ok(paper) if paper.owner == from => {
                if !self.session.is_current(ticket) {
                    info!("Account switched during submission of paper {}", paper.id);
                }
                let view = PaperView::new(paper, &self.session.viewer());
                view.access.visible.then_some(view)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Submitted paper could not be read back: {e}");
                None
            }
        }
    }

    async fn sign_or_empty(&self, from: Address, digest: B256) -> Bytes {
        let message = signing_message(digest);
        match self.registry.sign_message(from, message.as_bytes()).await {
            Ok(sig) => sig,
            Err(e) => {
                warn!("Signing declined for {from}, submitting unsigned: {e}");
                Bytes::new()
            }
        }
    }
}

fn connected(viewer: &Viewer) -> Result<Address> {
    viewer.address.ok_or(PortalError::WalletUnavailable)
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortalError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Cited paper ids from a comma-separated list.
///
/// Each item contributes its leading run of digits (`"12abc"` is 12); items
/// without one, negatives included, are dropped.
pub fn parse_references(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|item| {
            let item = item.trim_start();
            let item = item.strip_prefix('+').unwrap_or(item);
            let end = item
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(item.len());
            item[..end].parse().ok()
        })
        .collect()
}

/// Digest the author signs for a new paper.
pub fn submission_digest(title: &str, author: &str, ipfs_hash: &str) -> B256 {
    keccak256(format!("{title}|{author}|{ipfs_hash}"))
}

/// Digest the author signs for a new version.
pub fn version_digest(paper_id: u64, ipfs_hash: &str) -> B256 {
    keccak256(format!("{paper_id}|{ipfs_hash}"))
}

/// The personal message handed to the wallet: the digest as lowercase
/// `0x`-prefixed hex text, so verifiers recover the signer from those 66 bytes.
pub fn signing_message(digest: B256) -> String {
    format!("0x{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::db::memory_pool;
    use crate::testutil::{MockRegistry, AAA, BBB, CCC, OWNER};
    use crate::types::PaperStatus;

    #[derive(Default)]
    struct FakeStore {
        uploads: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for FakeStore {
        async fn upload(&self, _file_name: &str, content: Vec<u8>) -> Result<String> {
            if content.is_empty() {
                return Err(PortalError::InvalidInput("file is empty".to_string()));
            }
            let n = self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("QmUpload{n}"))
        }

        fn gateway_url(&self, cid: &str) -> String {
            format!("https://gw.test/ipfs/{cid}")
        }
    }

    struct Harness {
        mock: Arc<MockRegistry>,
        session: Arc<WalletSession>,
        pool: SqlitePool,
        dispatcher: Dispatcher,
    }

    async fn harness() -> Harness {
        let mock = Arc::new(MockRegistry::new());
        mock.add_auditor_now(BBB);
        let session = Arc::new(WalletSession::new());
        let pool = memory_pool().await;
        let dispatcher = Dispatcher::new(
            mock.clone(),
            session.clone(),
            Arc::new(FakeStore::default()),
            pool.clone(),
        );
        Harness {
            mock,
            session,
            pool,
            dispatcher,
        }
    }

    impl Harness {
        async fn connect(&self, account: Address) {
            self.session.switch_account(Some(account));
            self.session
                .refresh(&RoleResolver::new(self.mock.clone()))
                .await;
        }
    }

    fn pdf() -> Vec<u8> {
        b"%PDF-1.4 paper body".to_vec()
    }

    #[tokio::test]
    async fn auditor_approves_pending_paper() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "draft", PaperStatus::Pending, 1);
        h.connect(BBB).await;

        let outcome = h.dispatcher.approve(id).await.unwrap();
        assert_eq!(h.mock.status_of(id), PaperStatus::Published);
        let paper = outcome.paper.unwrap();
        assert_eq!(paper.paper.status, PaperStatus::Published);
        assert!(!paper.access.can_approve);

        let journal = db::recent_actions(&h.pool, 10).await.unwrap();
        assert_eq!(journal[0].action, "approvePaper");
        assert_eq!(journal[0].status, "confirmed");
        assert_eq!(journal[0].actor, BBB.to_string());
    }

    #[tokio::test]
    async fn contract_owner_rejects_pending_paper() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "draft", PaperStatus::Pending, 1);
        h.connect(OWNER).await;

        h.dispatcher.reject(id).await.unwrap();
        assert_eq!(h.mock.status_of(id), PaperStatus::Rejected);
    }

    #[tokio::test]
    async fn paper_owner_cannot_review_own_submission() {
        let h = harness().await;
        h.mock.add_auditor_now(AAA);
        let id = h.mock.add_paper(AAA, "mine", PaperStatus::Pending, 1);
        h.connect(AAA).await;

        let err = h.dispatcher.approve(id).await.unwrap_err();
        assert!(matches!(err, PortalError::PermissionDenied(_)));
        assert!(h.mock.sent().is_empty());
        assert!(db::recent_actions(&h.pool, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn published_paper_cannot_be_rejected() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "done", PaperStatus::Published, 1);
        h.connect(BBB).await;

        assert!(matches!(
            h.dispatcher.reject(id).await,
            Err(PortalError::PermissionDenied(_))
        ));
        assert_eq!(h.mock.status_of(id), PaperStatus::Published);
    }

    #[tokio::test]
    async fn disconnected_wallet_is_refused() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "draft", PaperStatus::Pending, 1);

        assert!(matches!(
            h.dispatcher.approve(id).await,
            Err(PortalError::WalletUnavailable)
        ));
        assert!(matches!(
            h.dispatcher.add_auditor(CCC).await,
            Err(PortalError::WalletUnavailable)
        ));
    }

    #[tokio::test]
    async fn unresolved_roles_grant_nothing() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "draft", PaperStatus::Pending, 1);
        h.session.switch_account(Some(BBB));

        assert!(matches!(
            h.dispatcher.approve(id).await,
            Err(PortalError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn unknown_paper_is_not_found() {
        let h = harness().await;
        h.connect(BBB).await;
        assert!(matches!(
            h.dispatcher.approve(42).await,
            Err(PortalError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reverted_transaction_is_journaled_and_state_kept() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "draft", PaperStatus::Pending, 1);
        h.connect(BBB).await;
        h.mock.revert_next();

        let err = h.dispatcher.approve(id).await.unwrap_err();
        assert!(matches!(err, PortalError::ContractCallFailed(_)));
        assert_eq!(h.mock.status_of(id), PaperStatus::Pending);

        let journal = db::recent_actions(&h.pool, 10).await.unwrap();
        assert_eq!(journal[0].status, "failed");
        assert!(journal[0].tx_hash.is_some());
        assert!(journal[0].error.as_deref().unwrap().contains("reverted"));
    }

    #[tokio::test]
    async fn read_back_uses_the_account_connected_now() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "draft", PaperStatus::Pending, 1);
        h.connect(BBB).await;
        let ticket = h.session.ticket();

        h.connect(CCC).await;
        assert!(h.dispatcher.read_back(id, ticket).await.unwrap().is_none());

        h.connect(AAA).await;
        let view = h.dispatcher.read_back(id, ticket).await.unwrap().unwrap();
        assert!(view.access.is_paper_owner);
    }

    #[tokio::test]
    async fn owner_manages_auditors() {
        let h = harness().await;
        h.connect(OWNER).await;

        let added = h.dispatcher.add_auditor(CCC).await.unwrap();
        assert!(added.target.roles.is_auditor);
        assert_eq!(added.target.address, Some(CCC));

        let removed = h.dispatcher.remove_auditor(BBB).await.unwrap();
        assert!(!removed.target.roles.is_auditor);
        assert!(removed.session.viewer.roles.is_contract_owner);

        let journal = db::recent_actions(&h.pool, 10).await.unwrap();
        assert_eq!(journal[0].action, "removeAuditor");
        assert_eq!(journal[0].target.as_deref(), Some(BBB.to_string().as_str()));
    }

    #[tokio::test]
    async fn auditors_cannot_manage_auditors() {
        let h = harness().await;
        h.connect(BBB).await;
        assert!(matches!(
            h.dispatcher.add_auditor(CCC).await,
            Err(PortalError::PermissionDenied(_))
        ));
        assert!(h.mock.sent().is_empty());
    }

    #[tokio::test]
    async fn each_entry_point_sends_its_own_call() {
        let h = harness().await;
        let first = h.mock.add_paper(AAA, "one", PaperStatus::Pending, 1);
        let second = h.mock.add_paper(AAA, "two", PaperStatus::Pending, 1);
        h.connect(OWNER).await;

        h.dispatcher.approve(first).await.unwrap();
        h.dispatcher.reject(second).await.unwrap();
        h.dispatcher.add_auditor(CCC).await.unwrap();
        h.dispatcher.remove_auditor(CCC).await.unwrap();

        let calls: Vec<_> = h.mock.sent().into_iter().map(|(_, call)| call).collect();
        assert_eq!(
            calls,
            vec![
                ContractWrite::ApprovePaper(first),
                ContractWrite::RejectPaper(second),
                ContractWrite::AddAuditor(CCC),
                ContractWrite::RemoveAuditor(CCC),
            ]
        );
    }

    #[tokio::test]
    async fn owner_adding_self_sees_fresh_roles() {
        let h = harness().await;
        h.connect(OWNER).await;
        let outcome = h.dispatcher.add_auditor(OWNER).await.unwrap();
        assert!(outcome.session.viewer.roles.is_auditor);
    }

    #[tokio::test]
    async fn submit_paper_uploads_signs_and_reads_back() {
        let h = harness().await;
        h.connect(AAA).await;

        let outcome = h
            .dispatcher
            .submit_paper(SubmitPaper {
                title: " Zero-knowledge review ".into(),
                author: "A. Author".into(),
                file_name: "paper.pdf".into(),
                content: pdf(),
                references: "3, 5,abc, ,7".into(),
            })
            .await
            .unwrap();

        assert_eq!(outcome.ipfs_hash, "QmUpload0");
        assert_eq!(outcome.gateway_url, "https://gw.test/ipfs/QmUpload0");
        assert_eq!(outcome.file_hash, keccak256(pdf()));
        assert!(outcome.signed);

        let paper = outcome.paper.unwrap();
        assert_eq!(paper.paper.title, "Zero-knowledge review");
        assert_eq!(paper.paper.owner, AAA);
        assert_eq!(paper.paper.status, PaperStatus::Pending);
        assert!(paper.access.is_paper_owner);

        let version = h.mock.latest_version(paper.paper.id);
        assert_eq!(version.references, vec![3, 5, 7]);
        assert_eq!(version.ipfs_hash, "QmUpload0");

        let digest = submission_digest("Zero-knowledge review", "A. Author", "QmUpload0");
        let signed = h.mock.signed_messages();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].len(), 66);
        assert_eq!(signed[0], format!("0x{}", hex::encode(digest)).into_bytes());
    }

    #[tokio::test]
    async fn declined_signature_submits_unsigned() {
        let h = harness().await;
        h.connect(AAA).await;
        h.mock.fail_signing();

        let outcome = h
            .dispatcher
            .submit_paper(SubmitPaper {
                title: "t".into(),
                author: "a".into(),
                file_name: "p.pdf".into(),
                content: pdf(),
                references: String::new(),
            })
            .await
            .unwrap();
        assert!(!outcome.signed);

        let sent = h.mock.sent();
        match &sent[0].1 {
            ContractWrite::SubmitPaper { signature, references, .. } => {
                assert!(signature.is_empty());
                assert!(references.is_empty());
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn submission_requires_title_author_and_content() {
        let h = harness().await;
        h.connect(AAA).await;
        let base = SubmitPaper {
            title: "t".into(),
            author: "a".into(),
            file_name: "p.pdf".into(),
            content: pdf(),
            references: String::new(),
        };

        let no_title = SubmitPaper {
            title: "  ".into(),
            ..base.clone()
        };
        assert!(matches!(
            h.dispatcher.submit_paper(no_title).await,
            Err(PortalError::InvalidInput(_))
        ));
        let no_file = SubmitPaper {
            content: Vec::new(),
            ..base
        };
        assert!(matches!(
            h.dispatcher.submit_paper(no_file).await,
            Err(PortalError::InvalidInput(_))
        ));
        assert!(h.mock.sent().is_empty());
    }

    #[tokio::test]
    async fn add_version_to_own_paper() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "mine", PaperStatus::Pending, 1);
        h.connect(AAA).await;

        let outcome = h
            .dispatcher
            .add_version(
                id,
                AddVersion {
                    file_name: "v2.pdf".into(),
                    content: pdf(),
                    references: "1".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.paper.unwrap().paper.version_count, 2);
        assert_eq!(h.mock.latest_version(id).references, vec![1]);
        assert_eq!(h.mock.latest_version(id).index, 1);
        assert_eq!(
            h.mock.signed_messages()[0],
            signing_message(version_digest(id, "QmUpload0")).into_bytes()
        );
    }

    #[tokio::test]
    async fn add_version_to_hidden_paper_is_denied() {
        let h = harness().await;
        let id = h.mock.add_paper(AAA, "draft", PaperStatus::Pending, 1);
        h.connect(CCC).await;

        let err = h
            .dispatcher
            .add_version(
                id,
                AddVersion {
                    file_name: "v2.pdf".into(),
                    content: pdf(),
                    references: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::PermissionDenied(_)));
        assert!(h.mock.sent().is_empty());
    }

    #[test]
    fn references_skip_non_numeric_items() {
        assert_eq!(parse_references(""), Vec::<u64>::new());
        assert_eq!(parse_references("1,2,3"), vec![1, 2, 3]);
        assert_eq!(parse_references(" 4 , x, -1, 9 "), vec![4, 9]);
    }

    #[test]
    fn references_keep_leading_digits() {
        assert_eq!(parse_references("12abc, 3.7,+5"), vec![12, 3, 5]);
        assert_eq!(parse_references("abc12"), Vec::<u64>::new());
    }

    #[test]
    fn signing_message_is_hex_text_of_digest() {
        fn decode_hex_text(text: &str) -> Vec<u8> {
            hex::decode(text.trim_start_matches("0x")).unwrap()
        }

        let digest = keccak256("7|Qm1".as_bytes());
        let message = signing_message(digest);
        assert_eq!(message.len(), 66);
        assert!(message.starts_with("0x"));
        assert_eq!(message, message.to_lowercase());
        assert_eq!(decode_hex_text(&message), digest.to_vec());
    }

    #[test]
    fn signing_digests_cover_their_fields() {
        assert_eq!(
            submission_digest("T", "A", "Qm1"),
            keccak256("T|A|Qm1".as_bytes())
        );
        assert_ne!(
            submission_digest("T", "A", "Qm1"),
            submission_digest("T", "A", "Qm2")
        );
        assert_eq!(version_digest(7, "Qm1"), keccak256("7|Qm1".as_bytes()));
    }
}
