//! Long-running background task that re-reads the program's stream accounts
//! and refreshes the SQLite cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use stream_accounting::{Clock, StreamRecord};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::account::decode_stream_account;
use crate::config::Config;
use crate::db;
use crate::errors::Result;
use crate::rpc::{ProgramAccount, RpcClient};

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub rpc: RpcClient,
    pub clock: Arc<dyn Clock>,
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub stored: usize,
    pub skipped: usize,
    pub pruned: u64,
}

/// Poll until `shutdown` is cancelled.
pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) {
    info!("Indexer starting for program {}", state.config.program_id);

    if let Ok(previous) = db::get_sync_state(&state.pool).await {
        if let Some(at) = previous.last_synced_at {
            let when = DateTime::<Utc>::from_timestamp(at, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| at.to_string());
            info!(
                "Cache holds {} streams from sync at {when}",
                previous.account_count
            );
        }
    }

    loop {
        // A pass blocked in RPC back-off must not hold up shutdown.
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Indexer stopping mid-sync");
                return;
            }
            outcome = sync_once(&state) => outcome,
        };

        match outcome {
            Ok(report) => info!(
                "Synced {} accounts → {} stored, {} skipped, {} pruned",
                report.fetched, report.stored, report.skipped, report.pruned
            ),
            Err(e) => error!("Indexer sync error: {e}"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Indexer stopping");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)) => {}
        }
    }
}

/// Perform a single sync pass: fetch, decode, store, prune.
pub async fn sync_once(state: &IndexerState) -> Result<SyncReport> {
    let accounts = state
        .rpc
        .get_program_accounts(&state.config.program_id, state.config.account_data_size)
        .await?;

    let (records, skipped) = decode_accounts(&accounts);
    let synced_at = state.clock.now();

    let stored = db::upsert_streams(&state.pool, &records, synced_at).await?;
    let pruned = db::prune_streams(&state.pool, synced_at).await?;
    db::save_sync_state(&state.pool, synced_at, records.len() as i64).await?;

    Ok(SyncReport {
        fetched: accounts.len(),
        stored,
        skipped,
        pruned,
    })
}

/// Decode every account, skipping (and logging) the ones that do not parse
/// or validate. Returns the records and the number skipped.
pub fn decode_accounts(accounts: &[ProgramAccount]) -> (Vec<StreamRecord>, usize) {
    let mut records = Vec::with_capacity(accounts.len());
    let mut skipped = 0usize;

    for account in accounts {
        let decoded = account
            .account
            .bytes()
            .and_then(|data| decode_stream_account(&account.pubkey, &data));
        match decoded {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping account {}: {e}", account.pubkey);
                skipped += 1;
            }
        }
    }

    (records, skipped)
}
