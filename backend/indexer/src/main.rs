//! Stream Indexer entry point.
//!
//! Starts a background task that periodically reads every stream account
//! owned by the streaming program through Solana `getProgramAccounts` and
//! caches them in SQLite.  Simultaneously exposes an Axum REST API that
//! serves those streams with metrics derived at request time.

mod account;
mod api;
mod config;
mod db;
mod errors;
mod indexer;
mod rpc;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use stream_accounting::{Clock, SystemClock};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use indexer::IndexerState;
use rpc::RpcClient;

/// Attempts for live lookups made while serving a request.
const API_RPC_ATTEMPTS: u32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // HTTP client shared between the indexer and live API lookups.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let rpc = RpcClient::new(client, &config.rpc_url, config.rpc_max_attempts);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let shutdown = CancellationToken::new();

    // ─── Background indexer ───────────────────────────────
    let indexer_state = Arc::new(IndexerState {
        pool: pool.clone(),
        config: config.clone(),
        rpc: rpc.clone(),
        clock: clock.clone(),
    });
    let indexer_task = tokio::spawn(indexer::run(indexer_state, shutdown.clone()));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState {
        pool,
        clock,
        rpc: Some(rpc.with_max_attempts(API_RPC_ATTEMPTS)),
        program_id: config.program_id.clone(),
        default_page_limit: config.default_page_limit,
        token_decimals: config.token_decimals,
        withdrawal_fee_bps: config.withdrawal_fee_bps,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/streams", get(api::list_streams))
        .route("/streams/validate", post(api::validate_stream))
        .route(
            "/streams/:id",
            get(api::get_stream).delete(api::validate_cancel),
        )
        .route("/streams/:id/actions", post(api::validate_action))
        .route("/streams/:id/schedule", get(api::get_schedule))
        .route("/wallets/:address/streams", get(api::get_wallet_streams))
        .route("/analytics", get(api::get_analytics))
        .route("/withdrawals/upcoming", get(api::get_upcoming_withdrawals))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    indexer_task.await?;

    Ok(())
}
