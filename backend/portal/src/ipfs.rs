//! IPFS upload client and gateway link builder.

use alloy_primitives::{keccak256, B256};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::{PortalError, Result};

/// Response of `POST /api/v0/add`.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: Option<String>,
}

/// Where paper files go before their CID is written on-chain.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `content` and return its content identifier.
    async fn upload(&self, file_name: &str, content: Vec<u8>) -> Result<String>;

    /// Public retrieval URL for `cid`.
    fn gateway_url(&self, cid: &str) -> String;
}

#[derive(Clone)]
pub struct IpfsClient {
    client: Client,
    api_url: String,
    gateway_url: String,
}

impl IpfsClient {
    pub fn new(client: Client, api_url: &str, gateway_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ContentStore for IpfsClient {
    async fn upload(&self, file_name: &str, content: Vec<u8>) -> Result<String> {
        if content.is_empty() {
            return Err(PortalError::InvalidInput("file is empty".to_string()));
        }
        let size = content.len();
        let part = Part::bytes(content).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(format!("{}/add", self.api_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortalError::UploadFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PortalError::UploadFailed(format!("IPFS node returned {status}: {body}")));
        }

        let body: AddResponse = resp
            .json()
            .await
            .map_err(|e| PortalError::UploadFailed(format!("unreadable IPFS response: {e}")))?;
        let cid = parse_cid(body)?;
        info!("Uploaded {file_name} ({size} bytes) to IPFS as {cid}");
        Ok(cid)
    }

    fn gateway_url(&self, cid: &str) -> String {
        let url = format!("{}/ipfs/{cid}", self.gateway_url);
        debug!("Gateway link {url}");
        url
    }
}

/// keccak256 digest stored on-chain as the version's `fileHash`.
pub fn file_digest(content: &[u8]) -> B256 {
    keccak256(content)
}

fn parse_cid(body: AddResponse) -> Result<String> {
    body.hash
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| PortalError::UploadFailed("IPFS response carried no Hash".to_string()))
}
