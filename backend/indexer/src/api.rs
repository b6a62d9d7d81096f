//! Axum REST API handlers.
//!
//! Every handler reads cached records from SQLite and derives metrics at
//! request time against the injected [`Clock`]; nothing derived is stored.

use std::cmp::Ordering;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use stream_accounting::portfolio::{
    can_cancel, can_transfer, can_update, filter_by_status, sort_by_status, split_by_wallet,
    summarize, upcoming_withdrawals, PortfolioSummary, UpcomingWithdrawal, WalletStreams,
};
use stream_accounting::{
    calculate_metrics, format_amount, format_duration, format_time_remaining, is_withdrawable,
    validate_new_stream, vesting_schedule, withdrawable_amount_of, withdrawal_fee, Clock,
    StreamMetrics, StreamParameters, StreamPermissions, StreamRecord, StreamStatus,
    VestingSchedule, WithdrawalFrequency,
};
use tracing::{error, info};

use crate::account::decode_stream_account;
use crate::config::is_pubkey;
use crate::db::{self, StreamFilter};
use crate::errors::IndexerError;
use crate::rpc::RpcClient;

pub const MAX_PAGE_LIMIT: usize = 100;
pub const DEFAULT_UPCOMING_LIMIT: usize = 10;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub clock: Arc<dyn Clock>,
    /// Live lookups for streams not cached yet; disabled when `None`.
    pub rpc: Option<RpcClient>,
    pub program_id: String,
    pub default_page_limit: usize,
    pub token_decimals: u32,
    /// Fee quoted on validated withdrawals, in basis points.
    pub withdrawal_fee_bps: u16,
}

// ─────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Internal(IndexerError),
}

impl From<IndexerError> for ApiError {
    fn from(e: IndexerError) -> Self {
        Self::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(e) => {
                error!("Request failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

/// A cached stream with its live metrics.
#[derive(Debug, Serialize)]
pub struct StreamView {
    #[serde(flatten)]
    pub record: StreamRecord,
    pub metrics: StreamMetrics,
    pub withdrawable: bool,
    pub streamed_display: String,
    pub withdrawable_display: String,
    pub time_remaining_display: String,
}

impl StreamView {
    pub fn new(record: StreamRecord, now: i64, decimals: u32) -> Self {
        let metrics = calculate_metrics(&record.params, now);
        let time_remaining_display = match metrics.status {
            StreamStatus::Canceled => "Canceled".to_string(),
            StreamStatus::Paused => {
                format!("{} (paused)", format_duration(metrics.time_remaining))
            }
            _ => format_time_remaining(record.params.end_time, now),
        };

        Self {
            withdrawable: is_withdrawable(&record.params, now),
            streamed_display: format_amount(metrics.streamed_amount, decimals),
            withdrawable_display: format_amount(metrics.withdrawable_amount, decimals),
            time_remaining_display,
            metrics,
            record,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub streams: Vec<StreamView>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    #[serde(flatten)]
    pub summary: PortfolioSummary,
    pub last_synced_at: Option<i64>,
    pub indexed_accounts: i64,
}

#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
    pub count: usize,
    pub withdrawals: Vec<UpcomingWithdrawal>,
}

/// A new stream that passed every check, as it would be submitted.
#[derive(Debug, Serialize)]
pub struct ValidatedStream {
    pub message: &'static str,
    pub sender: String,
    pub recipient: String,
    pub mint: String,
    pub name: String,
    pub created_at: i64,
    pub permissions: StreamPermissions,
    pub params: StreamParameters,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub message: String,
    pub stream_id: String,
    pub action: StreamAction,
    pub actor: Option<String>,
    pub amount: Option<u64>,
    pub fee: Option<u64>,
    pub net_amount: Option<u64>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ─────────────────────────────────────────────────────────
// Query strings
// ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub mint: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    pub frequency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelQuery {
    pub actor: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewStreamRequest {
    pub sender: String,
    pub recipient: String,
    pub mint: String,
    pub amount: u64,
    pub start_time: i64,
    pub end_time: i64,
    #[serde(default)]
    pub cliff_time: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "enabled")]
    pub cancelable_by_sender: bool,
    #[serde(default)]
    pub cancelable_by_recipient: bool,
    #[serde(default)]
    pub transferable_by_sender: bool,
    #[serde(default)]
    pub transferable_by_recipient: bool,
    #[serde(default)]
    pub automatic_withdrawal: bool,
    #[serde(default)]
    pub withdrawal_frequency: u64,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub actor: Option<String>,
    pub amount: Option<u64>,
}

/// Operations a client may ask to have checked before signing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamAction {
    Withdraw,
    Cancel,
    Pause,
    Resume,
    Transfer,
    Update,
}

impl StreamAction {
    fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw {
            "withdraw" => Ok(Self::Withdraw),
            "cancel" => Ok(Self::Cancel),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "transfer" => Ok(Self::Transfer),
            "update" => Ok(Self::Update),
            other => Err(ApiError::BadRequest(format!("Invalid action: {other}"))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Withdraw => "withdraw",
            Self::Cancel => "cancel",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Transfer => "transfer",
            Self::Update => "update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortField {
    CreatedAt,
    EndTime,
    Amount,
    Status,
}

impl SortField {
    fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        match raw.unwrap_or("created_at") {
            "created_at" => Ok(Self::CreatedAt),
            "end_time" => Ok(Self::EndTime),
            "amount" => Ok(Self::Amount),
            "status" => Ok(Self::Status),
            other => Err(ApiError::BadRequest(format!("Unknown sort_by: {other}"))),
        }
    }
}

fn descending(raw: Option<&str>) -> Result<bool, ApiError> {
    match raw.unwrap_or("desc") {
        "desc" => Ok(true),
        "asc" => Ok(false),
        other => Err(ApiError::BadRequest(format!("Unknown sort_order: {other}"))),
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /streams`
///
/// Filters by party, mint and derived status, then sorts and paginates.
/// Status sorting always lists live streams first and ignores `sort_order`.
pub async fn list_streams(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListResponse> {
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            StreamStatus::from_name(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {raw}")))
        })
        .transpose()?;
    let sort_field = SortField::parse(query.sort_by.as_deref())?;
    let desc = descending(query.sort_order.as_deref())?;

    let now = state.clock.now();
    let filter = StreamFilter {
        sender: query.sender,
        recipient: query.recipient,
        mint: query.mint,
    };
    let mut records = db::list_streams(&state.pool, &filter).await?;

    if let Some(status) = status {
        records = filter_by_status(&records, status, now)
            .into_iter()
            .cloned()
            .collect();
    }

    if sort_field == SortField::Status {
        sort_by_status(&mut records, now);
    } else {
        records.sort_by(|a, b| {
            let ord = compare(sort_field, a, b);
            let ord = if desc { ord.reverse() } else { ord };
            ord.then_with(|| a.id.cmp(&b.id))
        });
    }

    let total = records.len();
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(state.default_page_limit)
        .clamp(1, MAX_PAGE_LIMIT);
    let offset = (page - 1).saturating_mul(limit);

    let streams: Vec<StreamView> = records
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|r| StreamView::new(r, now, state.token_decimals))
        .collect();

    Ok(Json(ListResponse {
        count: streams.len(),
        total,
        page,
        limit,
        has_next: offset.saturating_add(streams.len()) < total,
        has_prev: page > 1,
        streams,
    }))
}

fn compare(field: SortField, a: &StreamRecord, b: &StreamRecord) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::EndTime => a.params.end_time.cmp(&b.params.end_time),
        SortField::Amount => a.params.total_amount.cmp(&b.params.total_amount),
        SortField::Status => Ordering::Equal,
    }
}

/// `GET /streams/:id`
pub async fn get_stream(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<StreamView> {
    let record = find_stream(&state, &id).await?;
    let now = state.clock.now();
    Ok(Json(StreamView::new(record, now, state.token_decimals)))
}

/// `GET /streams/:id/schedule?frequency=day`
pub async fn get_schedule(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<VestingSchedule> {
    let raw = query.frequency.as_deref().unwrap_or("day");
    let frequency = WithdrawalFrequency::from_name(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown frequency: {raw}")))?;

    let record = find_stream(&state, &id).await?;
    Ok(Json(vesting_schedule(&record.params, frequency)))
}

/// `GET /wallets/:address/streams`
pub async fn get_wallet_streams(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<WalletStreams<StreamView>> {
    if !is_pubkey(&address) {
        return Err(ApiError::BadRequest(format!("Invalid wallet address: {address}")));
    }

    let now = state.clock.now();
    let records = db::streams_for_wallet(&state.pool, &address).await?;
    let wallet = split_by_wallet(&records, &address, now)
        .map(|r| StreamView::new(r, now, state.token_decimals));
    Ok(Json(wallet))
}

/// `GET /analytics`
pub async fn get_analytics(State(state): State<Arc<ApiState>>) -> ApiResult<AnalyticsResponse> {
    let records = db::list_streams(&state.pool, &StreamFilter::default()).await?;
    let sync = db::get_sync_state(&state.pool).await?;

    Ok(Json(AnalyticsResponse {
        summary: summarize(&records, state.clock.now()),
        last_synced_at: sync.last_synced_at,
        indexed_accounts: sync.account_count,
    }))
}

/// `GET /withdrawals/upcoming?limit=10`
pub async fn get_upcoming_withdrawals(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<UpcomingQuery>,
) -> ApiResult<UpcomingResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_UPCOMING_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    let records = db::list_streams(&state.pool, &StreamFilter::default()).await?;
    let withdrawals = upcoming_withdrawals(&records, state.clock.now(), limit);

    Ok(Json(UpcomingResponse {
        count: withdrawals.len(),
        withdrawals,
    }))
}

// ─────────────────────────────────────────────────────────
// Pre-flight validation
// ─────────────────────────────────────────────────────────

/// `POST /streams/validate`
///
/// Checks a stream before it is created on chain. Nothing is stored.
pub async fn validate_stream(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<NewStreamRequest>,
) -> ApiResult<ValidatedStream> {
    for (role, address) in [
        ("sender", &body.sender),
        ("recipient", &body.recipient),
        ("mint", &body.mint),
    ] {
        if !is_pubkey(address) {
            return Err(ApiError::BadRequest(format!(
                "Invalid public key format for {role}: {address}"
            )));
        }
    }

    let now = state.clock.now();
    let params = StreamParameters {
        total_amount: body.amount,
        start_time: body.start_time,
        end_time: body.end_time,
        cliff_time: body.cliff_time,
        automatic_withdrawal: body.automatic_withdrawal,
        withdrawal_frequency: body.withdrawal_frequency,
        last_withdrawal_time: body.start_time,
        ..Default::default()
    };
    validate_new_stream(&params, now).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(ValidatedStream {
        message: "Stream creation data validated",
        sender: body.sender,
        recipient: body.recipient,
        mint: body.mint,
        name: body.name.unwrap_or_default(),
        created_at: now,
        permissions: StreamPermissions {
            cancelable_by_sender: body.cancelable_by_sender,
            cancelable_by_recipient: body.cancelable_by_recipient,
            transferable_by_sender: body.transferable_by_sender,
            transferable_by_recipient: body.transferable_by_recipient,
        },
        params,
    }))
}

/// `POST /streams/:id/actions`
pub async fn validate_action(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> ApiResult<ActionResponse> {
    let action = StreamAction::parse(&body.action)?;
    let record = find_stream(&state, &id).await?;
    check_action(&state, &record, action, body.actor, body.amount).map(Json)
}

/// `DELETE /streams/:id?actor=`
pub async fn validate_cancel(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> ApiResult<ActionResponse> {
    let record = find_stream(&state, &id).await?;
    check_action(&state, &record, StreamAction::Cancel, query.actor, None).map(Json)
}

fn check_action(
    state: &ApiState,
    record: &StreamRecord,
    action: StreamAction,
    actor: Option<String>,
    amount: Option<u64>,
) -> Result<ActionResponse, ApiError> {
    if let Some(actor) = &actor {
        if !is_pubkey(actor) {
            return Err(ApiError::BadRequest(format!("Invalid actor address: {actor}")));
        }
    }
    if record.params.canceled {
        return Err(ApiError::BadRequest(match action {
            StreamAction::Cancel => "Stream is already canceled".to_string(),
            _ => format!("Cannot {} a canceled stream", action.as_str()),
        }));
    }

    let now = state.clock.now();
    let mut response = ActionResponse {
        message: format!("Stream {} validated", action.as_str()),
        stream_id: record.id.clone(),
        action,
        actor: actor.clone(),
        amount: None,
        fee: None,
        net_amount: None,
    };

    if action == StreamAction::Withdraw {
        let amount = amount
            .filter(|&a| a > 0)
            .ok_or_else(|| ApiError::BadRequest("Amount required for withdrawal".to_string()))?;
        if actor.as_deref().is_some_and(|a| a != record.recipient) {
            return Err(ApiError::Forbidden(
                "Only the recipient can withdraw".to_string(),
            ));
        }
        if !is_withdrawable(&record.params, now) {
            return Err(ApiError::BadRequest(
                "Nothing is withdrawable from this stream".to_string(),
            ));
        }
        let available = withdrawable_amount_of(&record.params, now);
        if amount > available {
            return Err(ApiError::BadRequest(format!(
                "Insufficient available amount: {available}"
            )));
        }

        let fee = withdrawal_fee(amount, state.withdrawal_fee_bps)
            .map_err(|e| ApiError::Internal(e.into()))?;
        response.amount = Some(amount);
        response.fee = Some(fee);
        response.net_amount = Some(amount - fee);
        return Ok(response);
    }

    let actor = actor.ok_or_else(|| {
        ApiError::BadRequest(format!("Actor required for {}", action.as_str()))
    })?;
    let allowed = match action {
        StreamAction::Cancel => can_cancel(record, &actor),
        StreamAction::Transfer => can_transfer(record, &actor),
        StreamAction::Pause | StreamAction::Resume | StreamAction::Update => {
            can_update(record, &actor)
        }
        StreamAction::Withdraw => true,
    };
    if !allowed {
        return Err(ApiError::Forbidden(format!(
            "{actor} may not {} this stream",
            action.as_str()
        )));
    }

    match action {
        StreamAction::Pause if record.params.paused => Err(ApiError::BadRequest(
            "Stream is already paused".to_string(),
        )),
        StreamAction::Resume if !record.params.paused => {
            Err(ApiError::BadRequest("Stream is not paused".to_string()))
        }
        _ => Ok(response),
    }
}

// ─────────────────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────────────────

/// Cached record, or a live `getAccountInfo` fetch that is then cached.
async fn find_stream(state: &ApiState, id: &str) -> Result<StreamRecord, ApiError> {
    if !is_pubkey(id) {
        return Err(ApiError::BadRequest(format!("Invalid stream address: {id}")));
    }

    if let Some(record) = db::get_stream(&state.pool, id).await? {
        return Ok(record);
    }

    let not_found = || ApiError::NotFound(format!("Stream {id} not found"));
    let Some(rpc) = &state.rpc else {
        return Err(not_found());
    };

    let account = rpc.get_account_info(id).await?.ok_or_else(not_found)?;
    if account.owner != state.program_id {
        return Err(not_found());
    }

    let record = account
        .bytes()
        .and_then(|data| decode_stream_account(id, &data))
        .map_err(|e| ApiError::NotFound(format!("Account {id} is not a stream: {e}")))?;

    db::upsert_streams(&state.pool, std::slice::from_ref(&record), state.clock.now()).await?;
    info!("Cached stream {id} from a live lookup");
    Ok(record)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
