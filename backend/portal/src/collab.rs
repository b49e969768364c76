//! REST client for the comments and version-diff service.
//!
//! The service stores comments and extracted version text, and computes
//! line diffs between two stored versions. This module only forwards
//! requests; access checks happen in the API layer before any call.

use alloy_primitives::Address;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{PortalError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Opaque; the service has used both numeric and string ids.
    #[serde(default)]
    pub id: Value,
    pub user_addr: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Value,
}

/// One piece of a diff: unchanged text, or text added or removed in `verB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChunk {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DiffResponse {
    diff: Vec<DiffChunk>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: Option<String>,
}

#[derive(Clone)]
pub struct CollabClient {
    client: Client,
    base_url: String,
}

impl CollabClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /api/comments?paperId=`
    pub async fn comments(&self, paper_id: u64) -> Result<Vec<Comment>> {
        let resp = self
            .client
            .get(format!("{}/api/comments", self.base_url))
            .query(&[("paperId", paper_id)])
            .send()
            .await
            .map_err(upstream)?;
        read_json(resp).await
    }

    /// `POST /api/comments`
    pub async fn post_comment(&self, paper_id: u64, user: Address, content: &str) -> Result<()> {
        let content = comment_body(content)?;
        let resp = self
            .client
            .post(format!("{}/api/comments", self.base_url))
            .json(&json!({
                "paperId": paper_id,
                "userAddr": user.to_string(),
                "content": content,
            }))
            .send()
            .await
            .map_err(upstream)?;
        check_status(resp).await?;
        debug!(paper_id, user = %user, "Comment posted");
        Ok(())
    }

    /// `POST /api/version`: hand the extracted text of a version to the diff
    /// service.
    pub async fn submit_version_text(&self, paper_id: u64, index: u64, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/api/version", self.base_url))
            .json(&json!({
                "paperId": paper_id,
                "versionIndex": index,
                "text": text,
            }))
            .send()
            .await
            .map_err(upstream)?;
        check_status(resp).await?;
        Ok(())
    }

    /// `GET /api/diff?paperId&verA&verB`
    pub async fn diff(&self, paper_id: u64, ver_a: u64, ver_b: u64) -> Result<Vec<DiffChunk>> {
        let resp = self
            .client
            .get(format!("{}/api/diff", self.base_url))
            .query(&[("paperId", paper_id), ("verA", ver_a), ("verB", ver_b)])
            .send()
            .await
            .map_err(upstream)?;
        let body: DiffResponse = read_json(resp).await?;
        Ok(body.diff)
    }
}

/// Trimmed comment text; empty comments are refused before any request.
pub fn comment_body(content: &str) -> Result<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PortalError::InvalidInput("comment is empty".to_string()));
    }
    Ok(trimmed)
}

fn upstream(e: reqwest::Error) -> PortalError {
    PortalError::Upstream(e.to_string())
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(PortalError::Upstream(error_message(status.as_u16(), &body)))
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    check_status(resp)
        .await?
        .json()
        .await
        .map_err(|e| PortalError::Upstream(format!("unreadable response: {e}")))
}

/// Prefer the service's own `error` field over the raw body.
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ServiceError>(body) {
        Ok(ServiceError { error: Some(msg) }) if !msg.is_empty() => msg,
        _ if body.trim().is_empty() => format!("service returned HTTP {status}"),
        _ => format!("service returned HTTP {status}: {}", body.trim()),
    }
}
