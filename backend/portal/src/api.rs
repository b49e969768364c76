//! Axum REST API handlers.
//!
//! Reads are evaluated for the wallet session's current viewer. Errors are
//! rendered by [`PortalError`]'s `IntoResponse` impl.

use std::sync::Arc;

use alloy_primitives::Address;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::aggregator::{check_version_index, Aggregator, Listing, PaperView, PendingPaper};
use crate::collab::{Comment, CollabClient, DiffChunk};
use crate::db::{self, ActionRecord};
use crate::dispatcher::{self, AuditorOutcome, Dispatcher, PaperOutcome, UploadOutcome};
use crate::errors::{PortalError, Result};
use crate::ipfs::ContentStore;
use crate::roles::{RoleCheck, RoleResolver};
use crate::session::{SessionSnapshot, WalletSession};
use crate::types::{Version, Viewer};

pub struct ApiState {
    pub pool: SqlitePool,
    pub session: Arc<WalletSession>,
    pub resolver: RoleResolver,
    pub aggregator: Aggregator,
    pub dispatcher: Dispatcher,
    pub collab: CollabClient,
    pub store: Arc<dyn ContentStore>,
}

impl ApiState {
    fn viewer(&self) -> Viewer {
        self.session.viewer()
    }

    /// The current viewer, who must be connected.
    fn connected_viewer(&self) -> Result<(Address, Viewer)> {
        let viewer = self.viewer();
        let addr = viewer.address.ok_or(PortalError::WalletUnavailable)?;
        Ok((addr, viewer))
    }
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub check: RoleCheck,
    pub session: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SubmitPaperBody {
    pub title: String,
    pub author: String,
    pub file_name: String,
    /// Base64-encoded file content.
    pub content: String,
    #[serde(default)]
    pub references: String,
}

#[derive(Debug, Deserialize)]
pub struct AddVersionBody {
    pub file_name: String,
    pub content: String,
    #[serde(default)]
    pub references: String,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    #[serde(flatten)]
    pub version: Version,
    pub gateway_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VersionTextBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub paper_id: u64,
    pub count: usize,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    #[serde(rename = "verA")]
    pub ver_a: u64,
    #[serde(rename = "verB")]
    pub ver_b: u64,
}

#[derive(Debug, Serialize)]
pub struct DiffResponse {
    pub paper_id: u64,
    pub ver_a: u64,
    pub ver_b: u64,
    pub diff: Vec<DiffChunk>,
}

#[derive(Debug, Deserialize)]
pub struct AuditorBody {
    pub address: Address,
}

#[derive(Debug, Deserialize)]
pub struct ActionsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub count: usize,
    pub actions: Vec<ActionRecord>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /session`
pub async fn get_session(State(state): State<Arc<ApiState>>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

/// `POST /session/refresh`
pub async fn refresh_session(State(state): State<Arc<ApiState>>) -> Json<RefreshResponse> {
    let check = state.session.refresh(&state.resolver).await;
    Json(RefreshResponse {
        check,
        session: state.session.snapshot(),
    })
}

/// `GET /papers`
pub async fn list_papers(State(state): State<Arc<ApiState>>) -> Result<Json<Listing>> {
    Ok(Json(state.aggregator.list_papers(&state.viewer()).await?))
}

/// `POST /papers`
pub async fn submit_paper(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<SubmitPaperBody>,
) -> Result<Json<UploadOutcome>> {
    let content = decode_content(&body.content)?;
    let outcome = state
        .dispatcher
        .submit_paper(dispatcher::SubmitPaper {
            title: body.title,
            author: body.author,
            file_name: body.file_name,
            content,
            references: body.references,
        })
        .await?;
    Ok(Json(outcome))
}

/// `GET /papers/pending`
pub async fn pending_papers(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<PendingPaper>>> {
    Ok(Json(state.aggregator.pending_queue(&state.viewer()).await?))
}

/// `GET /papers/:id`
pub async fn get_paper(
    State(state): State<Arc<ApiState>>,
    Path(paper_id): Path<u64>,
) -> Result<Json<PaperView>> {
    Ok(Json(state.aggregator.paper(paper_id, &state.viewer()).await?))
}

/// `POST /papers/:id/versions`
pub async fn add_version(
    State(state): State<Arc<ApiState>>,
    Path(paper_id): Path<u64>,
    Json(body): Json<AddVersionBody>,
) -> Result<Json<UploadOutcome>> {
    let content = decode_content(&body.content)?;
    let outcome = state
        .dispatcher
        .add_version(
            paper_id,
            dispatcher::AddVersion {
                file_name: body.file_name,
                content,
                references: body.references,
            },
        )
        .await?;
    Ok(Json(outcome))
}

/// `GET /papers/:id/versions/:index`
pub async fn get_version(
    State(state): State<Arc<ApiState>>,
    Path((paper_id, index)): Path<(u64, u64)>,
) -> Result<Json<VersionResponse>> {
    let version = state
        .aggregator
        .visible_version(paper_id, index, &state.viewer())
        .await?;
    let gateway_url = state.store.gateway_url(&version.ipfs_hash);
    Ok(Json(VersionResponse {
        version,
        gateway_url,
    }))
}

/// `POST /papers/:id/versions/:index/text`
pub async fn submit_version_text(
    State(state): State<Arc<ApiState>>,
    Path((paper_id, index)): Path<(u64, u64)>,
    Json(body): Json<VersionTextBody>,
) -> Result<Json<serde_json::Value>> {
    let (_, viewer) = state.connected_viewer()?;
    if body.text.trim().is_empty() {
        return Err(PortalError::InvalidInput("version text is empty".to_string()));
    }
    let view = state.aggregator.paper(paper_id, &viewer).await?;
    check_version_index(&view.paper, index)?;
    state
        .collab
        .submit_version_text(paper_id, index, &body.text)
        .await?;
    Ok(Json(serde_json::json!({ "paper_id": paper_id, "version_index": index })))
}

/// `POST /papers/:id/approve`
pub async fn approve_paper(
    State(state): State<Arc<ApiState>>,
    Path(paper_id): Path<u64>,
) -> Result<Json<PaperOutcome>> {
    Ok(Json(state.dispatcher.approve(paper_id).await?))
}

/// `POST /papers/:id/reject`
pub async fn reject_paper(
    State(state): State<Arc<ApiState>>,
    Path(paper_id): Path<u64>,
) -> Result<Json<PaperOutcome>> {
    Ok(Json(state.dispatcher.reject(paper_id).await?))
}

/// `GET /papers/:id/comments`
pub async fn get_comments(
    State(state): State<Arc<ApiState>>,
    Path(paper_id): Path<u64>,
) -> Result<Json<CommentsResponse>> {
    state.aggregator.paper(paper_id, &state.viewer()).await?;
    comments_response(&state, paper_id).await
}

/// `POST /papers/:id/comments`
///
/// Returns the refreshed comment list.
pub async fn post_comment(
    State(state): State<Arc<ApiState>>,
    Path(paper_id): Path<u64>,
    Json(body): Json<CommentBody>,
) -> Result<Json<CommentsResponse>> {
    let (addr, viewer) = state.connected_viewer()?;
    state.aggregator.paper(paper_id, &viewer).await?;
    state.collab.post_comment(paper_id, addr, &body.content).await?;
    comments_response(&state, paper_id).await
}

async fn comments_response(state: &ApiState, paper_id: u64) -> Result<Json<CommentsResponse>> {
    let comments = state.collab.comments(paper_id).await?;
    Ok(Json(CommentsResponse {
        paper_id,
        count: comments.len(),
        comments,
    }))
}

/// `GET /papers/:id/diff?verA=&verB=`
pub async fn get_diff(
    State(state): State<Arc<ApiState>>,
    Path(paper_id): Path<u64>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<DiffResponse>> {
    let view = state.aggregator.paper(paper_id, &state.viewer()).await?;
    check_version_index(&view.paper, query.ver_a)?;
    check_version_index(&view.paper, query.ver_b)?;
    let diff = state
        .collab
        .diff(paper_id, query.ver_a, query.ver_b)
        .await?;
    Ok(Json(DiffResponse {
        paper_id,
        ver_a: query.ver_a,
        ver_b: query.ver_b,
        diff,
    }))
}

/// `POST /auditors`
pub async fn add_auditor(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<AuditorBody>,
) -> Result<Json<AuditorOutcome>> {
    Ok(Json(state.dispatcher.add_auditor(body.address).await?))
}

/// `DELETE /auditors/:address`
pub async fn remove_auditor(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<AuditorOutcome>> {
    let target = address
        .parse::<Address>()
        .map_err(|_| PortalError::InvalidInput(format!("invalid address: {address}")))?;
    Ok(Json(state.dispatcher.remove_auditor(target).await?))
}

/// `GET /actions?limit=`
///
/// The action journal, newest first. Auditors and the contract owner only.
pub async fn list_actions(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ActionsQuery>,
) -> Result<Json<ActionsResponse>> {
    if !state.viewer().roles.is_privileged() {
        return Err(PortalError::PermissionDenied(
            "the action journal is limited to auditors and the contract owner".to_string(),
        ));
    }
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let actions = db::recent_actions(&state.pool, limit).await?;
    Ok(Json(ActionsResponse {
        count: actions.len(),
        actions,
    }))
}

fn decode_content(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| PortalError::InvalidInput(format!("content is not valid base64: {e}")))
}
