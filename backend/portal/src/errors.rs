//! Application-wide error types.
//!
//! Every failure is recoverable from the caller's point of view: the API layer
//! renders it as a transient notification and the session carries on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    /// No wallet account is connected (node exposes no accounts).
    #[error("No wallet connected: connect a wallet account to continue")]
    WalletUnavailable,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Network failure, revert, or undecodable contract response.
    #[error("Contract call failed: {0}")]
    ContractCallFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IPFS upload failed: {0}")]
    UploadFailed(String),

    /// Comments / diff service failure.
    #[error("Collaboration service error: {0}")]
    Upstream(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PortalError {
    /// Short machine-readable identifier used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WalletUnavailable => "wallet_unavailable",
            Self::PermissionDenied(_) => "permission_denied",
            Self::ContractCallFailed(_) => "contract_call_failed",
            Self::NotFound(_) => "not_found",
            Self::UploadFailed(_) => "upload_failed",
            Self::Upstream(_) => "upstream",
            Self::InvalidInput(_) => "invalid_input",
            Self::Database(_) | Self::Migrate(_) => "database",
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
        }
    }

    /// Whether repeating the same user action may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ContractCallFailed(_)
                | Self::UploadFailed(_)
                | Self::Upstream(_)
                | Self::Http(_)
                | Self::Database(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;

impl PortalError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::WalletUnavailable => StatusCode::PRECONDITION_FAILED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ContractCallFailed(_) | Self::UploadFailed(_) | Self::Upstream(_) | Self::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Database(_) | Self::Migrate(_) | Self::Json(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    pub retriable: bool,
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, kind = self.kind(), status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %message, kind = self.kind(), status = status.as_u16(), "Request refused");
        }

        let body = ErrorResponse {
            error: message,
            kind: self.kind(),
            retriable: self.is_retriable(),
        };
        (status, Json(body)).into_response()
    }
}
