//! Database layer: migrations and the action journal.
//!
//! The contract is the source of truth for paper state. The journal only
//! records what the portal dispatched and how each transaction ended.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Recorded, transaction not yet accepted by the node.
    Submitted,
    /// Transaction hash known, awaiting receipt.
    Pending,
    Confirmed,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

/// A journal row as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActionRecord {
    pub id: i64,
    pub action: String,
    pub paper_id: Option<i64>,
    pub target: Option<String>,
    pub actor: String,
    pub tx_hash: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// What is about to be dispatched.
#[derive(Debug, Clone)]
pub struct NewAction<'a> {
    pub action: &'a str,
    pub paper_id: Option<u64>,
    pub target: Option<String>,
    pub actor: String,
}

// ─────────────────────────────────────────────────────────
// Journal writes
// ─────────────────────────────────────────────────────────

pub async fn record_action(pool: &SqlitePool, new: &NewAction<'_>) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let id = sqlx::query(
        r#"
        INSERT INTO review_actions
            (action, paper_id, target, actor, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
    )
    .bind(new.action)
    .bind(new.paper_id.map(|id| id as i64))
    .bind(&new.target)
    .bind(&new.actor)
    .bind(ActionStatus::Submitted.as_str())
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn mark_pending(pool: &SqlitePool, id: i64, tx_hash: &str) -> Result<()> {
    sqlx::query("UPDATE review_actions SET status = ?1, tx_hash = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(ActionStatus::Pending.as_str())
        .bind(tx_hash)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_confirmed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE review_actions SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(ActionStatus::Confirmed.as_str())
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_failed(pool: &SqlitePool, id: i64, error: &str) -> Result<()> {
    sqlx::query("UPDATE review_actions SET status = ?1, error = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(ActionStatus::Failed.as_str())
        .bind(error)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Journal reads
// ─────────────────────────────────────────────────────────

/// Most recent actions first.
pub async fn recent_actions(pool: &SqlitePool, limit: i64) -> Result<Vec<ActionRecord>> {
    let rows = sqlx::query_as::<_, ActionRecord>(
        r#"
        SELECT id, action, paper_id, target, actor, tx_hash, status, error,
               created_at, updated_at
        FROM   review_actions
        ORDER  BY id DESC
        LIMIT  ?1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Single-connection in-memory database with migrations applied.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}
