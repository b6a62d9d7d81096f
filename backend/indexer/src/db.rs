//! Database layer: migrations, the stream cache and sync bookkeeping.

use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};
use stream_accounting::{StreamParameters, StreamPermissions, StreamRecord};
use tracing::info;

use crate::errors::{IndexerError, Result};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let url = if url.contains(":memory:") || url.contains("mode=") {
        url
    } else if url.contains('?') {
        format!("{url}&mode=rwc")
    } else {
        format!("{url}?mode=rwc")
    };

    // Every in-memory connection is its own database, so keep exactly one alive.
    let options = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = options.connect(&url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct StreamRow {
    id: String,
    sender: String,
    recipient: String,
    mint: String,
    name: String,
    created_at: i64,
    deposited_amount: String,
    withdrawn_amount: String,
    start_time: i64,
    end_time: i64,
    cliff_time: Option<i64>,
    paused: bool,
    paused_at: Option<i64>,
    total_paused_time: i64,
    canceled: bool,
    automatic_withdrawal: bool,
    withdrawal_frequency: String,
    last_withdrawal_time: i64,
    cancelable_by_sender: bool,
    cancelable_by_recipient: bool,
    transferable_by_sender: bool,
    transferable_by_recipient: bool,
}

impl TryFrom<StreamRow> for StreamRecord {
    type Error = IndexerError;

    fn try_from(row: StreamRow) -> Result<Self> {
        let amount = |column: &str, raw: &str| -> Result<u64> {
            raw.parse().map_err(|_| IndexerError::CorruptRow {
                id: row.id.clone(),
                reason: format!("{column} is not a u64: {raw:?}"),
            })
        };

        let params = StreamParameters {
            total_amount: amount("deposited_amount", &row.deposited_amount)?,
            start_time: row.start_time,
            end_time: row.end_time,
            cliff_time: row.cliff_time,
            withdrawn_amount: amount("withdrawn_amount", &row.withdrawn_amount)?,
            paused: row.paused,
            paused_at: row.paused_at,
            total_paused_time: row.total_paused_time,
            canceled: row.canceled,
            automatic_withdrawal: row.automatic_withdrawal,
            withdrawal_frequency: amount("withdrawal_frequency", &row.withdrawal_frequency)?,
            last_withdrawal_time: row.last_withdrawal_time,
        };

        Ok(StreamRecord {
            id: row.id,
            sender: row.sender,
            recipient: row.recipient,
            mint: row.mint,
            name: row.name,
            created_at: row.created_at,
            permissions: StreamPermissions {
                cancelable_by_sender: row.cancelable_by_sender,
                cancelable_by_recipient: row.cancelable_by_recipient,
                transferable_by_sender: row.transferable_by_sender,
                transferable_by_recipient: row.transferable_by_recipient,
            },
            params,
        })
    }
}

fn into_records(rows: Vec<StreamRow>) -> Result<Vec<StreamRecord>> {
    rows.into_iter().map(StreamRecord::try_from).collect()
}

const SELECT_STREAMS: &str = r#"
    SELECT id, sender, recipient, mint, name, created_at,
           deposited_amount, withdrawn_amount, start_time, end_time, cliff_time,
           paused, paused_at, total_paused_time, canceled,
           automatic_withdrawal, withdrawal_frequency, last_withdrawal_time,
           cancelable_by_sender, cancelable_by_recipient,
           transferable_by_sender, transferable_by_recipient
    FROM   streams
"#;

// ─────────────────────────────────────────────────────────
// Stream writes
// ─────────────────────────────────────────────────────────

/// Insert or refresh a batch of decoded streams, stamping each with
/// `synced_at`. Runs in one transaction.
pub async fn upsert_streams(
    pool: &SqlitePool,
    records: &[StreamRecord],
    synced_at: i64,
) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for record in records {
        let p = &record.params;
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO streams
                (id, sender, recipient, mint, name, created_at,
                 deposited_amount, withdrawn_amount, start_time, end_time, cliff_time,
                 paused, paused_at, total_paused_time, canceled,
                 automatic_withdrawal, withdrawal_frequency, last_withdrawal_time,
                 cancelable_by_sender, cancelable_by_recipient,
                 transferable_by_sender, transferable_by_recipient, synced_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                    ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
            ON CONFLICT(id) DO UPDATE SET
                sender                    = excluded.sender,
                recipient                 = excluded.recipient,
                mint                      = excluded.mint,
                name                      = excluded.name,
                created_at                = excluded.created_at,
                deposited_amount          = excluded.deposited_amount,
                withdrawn_amount          = excluded.withdrawn_amount,
                start_time                = excluded.start_time,
                end_time                  = excluded.end_time,
                cliff_time                = excluded.cliff_time,
                paused                    = excluded.paused,
                paused_at                 = excluded.paused_at,
                total_paused_time         = excluded.total_paused_time,
                canceled                  = excluded.canceled,
                automatic_withdrawal      = excluded.automatic_withdrawal,
                withdrawal_frequency      = excluded.withdrawal_frequency,
                last_withdrawal_time      = excluded.last_withdrawal_time,
                cancelable_by_sender      = excluded.cancelable_by_sender,
                cancelable_by_recipient   = excluded.cancelable_by_recipient,
                transferable_by_sender    = excluded.transferable_by_sender,
                transferable_by_recipient = excluded.transferable_by_recipient,
                synced_at                 = excluded.synced_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.sender)
        .bind(&record.recipient)
        .bind(&record.mint)
        .bind(&record.name)
        .bind(record.created_at)
        .bind(p.total_amount.to_string())
        .bind(p.withdrawn_amount.to_string())
        .bind(p.start_time)
        .bind(p.end_time)
        .bind(p.cliff_time)
        .bind(p.paused)
        .bind(p.paused_at)
        .bind(p.total_paused_time)
        .bind(p.canceled)
        .bind(p.automatic_withdrawal)
        .bind(p.withdrawal_frequency.to_string())
        .bind(p.last_withdrawal_time)
        .bind(record.permissions.cancelable_by_sender)
        .bind(record.permissions.cancelable_by_recipient)
        .bind(record.permissions.transferable_by_sender)
        .bind(record.permissions.transferable_by_recipient)
        .bind(synced_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }

    tx.commit().await?;
    Ok(count)
}

/// Drop streams that were not seen by the sync stamped `synced_at`
/// (closed accounts). Returns how many were removed.
pub async fn prune_streams(pool: &SqlitePool, synced_at: i64) -> Result<u64> {
    let removed = sqlx::query("DELETE FROM streams WHERE synced_at < ?1")
        .bind(synced_at)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(removed)
}

// ─────────────────────────────────────────────────────────
// Stream reads
// ─────────────────────────────────────────────────────────

/// Column filters for [`list_streams`]. `None` matches everything.
#[derive(Debug, Default, Clone)]
pub struct StreamFilter {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub mint: Option<String>,
}

pub async fn get_stream(pool: &SqlitePool, id: &str) -> Result<Option<StreamRecord>> {
    let row = sqlx::query_as::<_, StreamRow>(&format!("{SELECT_STREAMS} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(StreamRecord::try_from).transpose()
}

/// Streams matching `filter`, newest first.
pub async fn list_streams(pool: &SqlitePool, filter: &StreamFilter) -> Result<Vec<StreamRecord>> {
    let rows = sqlx::query_as::<_, StreamRow>(&format!(
        r#"{SELECT_STREAMS}
        WHERE  (?1 IS NULL OR sender = ?1)
          AND  (?2 IS NULL OR recipient = ?2)
          AND  (?3 IS NULL OR mint = ?3)
        ORDER  BY created_at DESC, id ASC"#
    ))
    .bind(&filter.sender)
    .bind(&filter.recipient)
    .bind(&filter.mint)
    .fetch_all(pool)
    .await?;
    into_records(rows)
}

/// Streams where `wallet` is the sender or the recipient.
pub async fn streams_for_wallet(pool: &SqlitePool, wallet: &str) -> Result<Vec<StreamRecord>> {
    let rows = sqlx::query_as::<_, StreamRow>(&format!(
        r#"{SELECT_STREAMS}
        WHERE  sender = ?1 OR recipient = ?1
        ORDER  BY created_at DESC, id ASC"#
    ))
    .bind(wallet)
    .fetch_all(pool)
    .await?;
    into_records(rows)
}

// ─────────────────────────────────────────────────────────
// Sync bookkeeping
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct SyncState {
    pub last_synced_at: Option<i64>,
    pub account_count: i64,
}

pub async fn get_sync_state(pool: &SqlitePool) -> Result<SyncState> {
    let state = sqlx::query_as::<_, SyncState>(
        "SELECT last_synced_at, account_count FROM indexer_state WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(state.unwrap_or_default())
}

pub async fn save_sync_state(pool: &SqlitePool, synced_at: i64, account_count: i64) -> Result<()> {
    sqlx::query("UPDATE indexer_state SET last_synced_at = ?1, account_count = ?2 WHERE id = 1")
        .bind(synced_at)
        .bind(account_count)
        .execute(pool)
        .await?;
    Ok(())
}
