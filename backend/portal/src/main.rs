//! Paper review portal backend: entry point.
//!
//! Starts a background wallet watcher that follows the node's active account
//! and resolves its contract roles, and exposes an Axum REST API for listing,
//! reviewing, submitting and discussing papers registered on-chain.

mod abi;
mod aggregator;
mod api;
mod collab;
mod config;
mod db;
mod dispatcher;
mod errors;
mod ipfs;
mod policy;
mod registry;
mod roles;
mod rpc;
mod session;
#[cfg(test)]
mod testutil;
mod types;
mod wallet;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aggregator::Aggregator;
use collab::CollabClient;
use config::Config;
use dispatcher::Dispatcher;
use ipfs::{ContentStore, IpfsClient};
use registry::PaperRegistry;
use roles::RoleResolver;
use rpc::RpcRegistry;
use session::WalletSession;
use wallet::WalletWatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!(
        "Paper registry {} via {}",
        config.contract_address, config.rpc_url
    );

    // Action journal.
    let pool = db::init_pool(&config.database_url).await?;

    // HTTP client shared by the node, IPFS and comments clients.
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    let registry: Arc<dyn PaperRegistry> = Arc::new(RpcRegistry::new(client.clone(), &config));
    let store: Arc<dyn ContentStore> = Arc::new(IpfsClient::new(
        client.clone(),
        &config.ipfs_api_url,
        &config.ipfs_gateway_url,
    ));
    let session = Arc::new(WalletSession::new());
    let resolver = RoleResolver::new(registry.clone());
    let shutdown = CancellationToken::new();

    // ─── Background wallet watcher ────────────────────────
    let watcher = Arc::new(WalletWatcher {
        registry: registry.clone(),
        resolver: resolver.clone(),
        session: session.clone(),
        pinned: config.wallet_address,
        poll_interval: Duration::from_secs(config.wallet_poll_interval_secs.max(1)),
    });
    let watcher_task = tokio::spawn(wallet::run(watcher, shutdown.clone()));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState {
        dispatcher: Dispatcher::new(registry.clone(), session.clone(), store.clone(), pool.clone()),
        aggregator: Aggregator::new(registry),
        collab: CollabClient::new(client, &config.collab_api_url),
        pool,
        session,
        resolver,
        store,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/session", get(api::get_session))
        .route("/session/refresh", post(api::refresh_session))
        .route("/papers", get(api::list_papers).post(api::submit_paper))
        .route("/papers/pending", get(api::pending_papers))
        .route("/papers/:id", get(api::get_paper))
        .route("/papers/:id/versions", post(api::add_version))
        .route("/papers/:id/versions/:index", get(api::get_version))
        .route(
            "/papers/:id/versions/:index/text",
            post(api::submit_version_text),
        )
        .route("/papers/:id/approve", post(api::approve_paper))
        .route("/papers/:id/reject", post(api::reject_paper))
        .route(
            "/papers/:id/comments",
            get(api::get_comments).post(api::post_comment),
        )
        .route("/papers/:id/diff", get(api::get_diff))
        .route("/auditors", post(api::add_auditor))
        .route("/auditors/:address", delete(api::remove_auditor))
        .route("/actions", get(api::list_actions))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await?;

    shutdown.cancel();
    watcher_task.await?;
    Ok(())
}
