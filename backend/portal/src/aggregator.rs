//! Read side: paper listings, detail and version lookup, filtered through the
//! visibility policy.
//!
//! Every call reads the contract afresh; results are snapshots the caller
//! drops on the next reload.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{PortalError, Result};
use crate::policy::PaperAccess;
use crate::registry::PaperRegistry;
use crate::types::{Paper, PaperStatus, Version, Viewer};

/// A paper together with what the viewer may do with it.
#[derive(Debug, Clone, Serialize)]
pub struct PaperView {
    #[serde(flatten)]
    pub paper: Paper,
    pub access: PaperAccess,
}

impl PaperView {
    pub fn new(paper: Paper, viewer: &Viewer) -> Self {
        let access = PaperAccess::evaluate(&paper, viewer);
        Self { paper, access }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub papers: Vec<PaperView>,
    /// Ids whose contract read failed and were left out.
    pub skipped: Vec<u64>,
}

/// Review-queue entry: a pending paper with its original submission.
#[derive(Debug, Clone, Serialize)]
pub struct PendingPaper {
    #[serde(flatten)]
    pub view: PaperView,
    pub ipfs_hash: String,
    pub submitted_at: u64,
}

#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<dyn PaperRegistry>,
}

impl Aggregator {
    pub fn new(registry: Arc<dyn PaperRegistry>) -> Self {
        Self { registry }
    }

    /// All papers visible to `viewer`, ascending by id.
    pub async fn list_papers(&self, viewer: &Viewer) -> Result<Listing> {
        let count = self.registry.paper_count().await?;
        let mut papers = Vec::new();
        let mut skipped = Vec::new();

        for id in 1..=count {
            match self.registry.paper_info(id).await {
                Ok(paper) => {
                    let view = PaperView::new(paper, viewer);
                    if view.access.visible {
                        papers.push(view);
                    }
                }
                Err(e) => {
                    warn!("Skipping paper {id}: {e}");
                    skipped.push(id);
                }
            }
        }

        debug!(
            "Listed {} of {count} papers ({} skipped)",
            papers.len(),
            skipped.len()
        );
        Ok(Listing { papers, skipped })
    }

    /// Metadata of `paper_id`, whether or not any viewer may see it.
    pub async fn fetch_paper(&self, paper_id: u64) -> Result<Paper> {
        let count = self.registry.paper_count().await?;
        if paper_id == 0 || paper_id > count {
            return Err(PortalError::NotFound(format!("paper {paper_id}")));
        }
        self.registry.paper_info(paper_id).await
    }

    /// Paper detail for `viewer`; hidden papers are refused.
    pub async fn paper(&self, paper_id: u64, viewer: &Viewer) -> Result<PaperView> {
        let view = PaperView::new(self.fetch_paper(paper_id).await?, viewer);
        if !view.access.visible {
            return Err(PortalError::PermissionDenied(format!(
                "paper {paper_id} is {} and only visible to its owner, auditors and the contract owner",
                view.paper.status
            )));
        }
        Ok(view)
    }

    pub async fn get_version(&self, paper_id: u64, index: u64) -> Result<Version> {
        let paper = self.fetch_paper(paper_id).await?;
        check_version_index(&paper, index)?;
        self.registry.version(paper_id, index).await
    }

    pub async fn visible_version(&self, paper_id: u64, index: u64, viewer: &Viewer) -> Result<Version> {
        self.paper(paper_id, viewer).await?;
        self.get_version(paper_id, index).await
    }

    /// Pending papers awaiting review; auditors and the contract owner only.
    pub async fn pending_queue(&self, viewer: &Viewer) -> Result<Vec<PendingPaper>> {
        if !viewer.roles.is_privileged() {
            return Err(PortalError::PermissionDenied(
                "only auditors and the contract owner can review papers".to_string(),
            ));
        }

        let count = self.registry.paper_count().await?;
        let mut queue = Vec::new();
        for id in 1..=count {
            match self.pending_entry(id, viewer).await {
                Ok(Some(entry)) => queue.push(entry),
                Ok(None) => {}
                Err(e) => warn!("Skipping paper {id} in review queue: {e}"),
            }
        }
        Ok(queue)
    }

    async fn pending_entry(&self, id: u64, viewer: &Viewer) -> Result<Option<PendingPaper>> {
        let paper = self.registry.paper_info(id).await?;
        if paper.status != PaperStatus::Pending {
            return Ok(None);
        }
        let (ipfs_hash, submitted_at) = if paper.version_count > 0 {
            let first = self.registry.version(id, 0).await?;
            (first.ipfs_hash, first.timestamp)
        } else {
            (String::new(), 0)
        };
        Ok(Some(PendingPaper {
            view: PaperView::new(paper, viewer),
            ipfs_hash,
            submitted_at,
        }))
    }
}

pub fn check_version_index(paper: &Paper, index: u64) -> Result<()> {
    if index >= paper.version_count {
        return Err(PortalError::NotFound(format!(
            "paper {} has no version {index} (available: {})",
            paper.id,
            version_range(paper.version_count)
        )));
    }
    Ok(())
}

fn version_range(count: u64) -> String {
    match count {
        0 => "none".to_string(),
        n => format!("0 to {}", n - 1),
    }
}
