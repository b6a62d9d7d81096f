//! Helpers over collections of [`StreamRecord`]s: permissions, ordering,
//! filtering, totals and the per-wallet view.
//!
//! Everything is computed through [`crate::math`], so listing views and the
//! single-stream view can never disagree.

use serde::Serialize;

use crate::math::{calculate_metrics, next_withdrawal_time_of, status_of, withdrawable_amount_of};
use crate::types::{StreamRecord, StreamStatus};

// ─────────────────────────────────────────────────────────
// Permissions
// ─────────────────────────────────────────────────────────

/// `actor` may cancel when the flag for their role is set.
pub fn can_cancel(record: &StreamRecord, actor: &str) -> bool {
    if record.params.canceled {
        return false;
    }

    (actor == record.sender && record.permissions.cancelable_by_sender)
        || (actor == record.recipient && record.permissions.cancelable_by_recipient)
}

/// `actor` may hand the stream to a new recipient.
pub fn can_transfer(record: &StreamRecord, actor: &str) -> bool {
    if record.params.canceled {
        return false;
    }

    (actor == record.sender && record.permissions.transferable_by_sender)
        || (actor == record.recipient && record.permissions.transferable_by_recipient)
}

/// Only the sender may update permissions, and only on a live stream.
pub fn can_update(record: &StreamRecord, actor: &str) -> bool {
    !record.params.canceled && actor == record.sender
}

// ─────────────────────────────────────────────────────────
// Ordering and filtering
// ─────────────────────────────────────────────────────────

/// Orders by status priority (active first, canceled last), newest start
/// time first within a status.
pub fn sort_by_status(records: &mut [StreamRecord], now: i64) {
    records.sort_by(|a, b| {
        let pa = status_of(&a.params, now).sort_priority();
        let pb = status_of(&b.params, now).sort_priority();
        pa.cmp(&pb)
            .then_with(|| b.params.start_time.cmp(&a.params.start_time))
    });
}

pub fn filter_by_status<'a>(
    records: &'a [StreamRecord],
    status: StreamStatus,
    now: i64,
) -> Vec<&'a StreamRecord> {
    records
        .iter()
        .filter(|r| status_of(&r.params, now) == status)
        .collect()
}

// ─────────────────────────────────────────────────────────
// Totals
// ─────────────────────────────────────────────────────────

pub fn total_value(records: &[StreamRecord]) -> u128 {
    records.iter().map(|r| r.params.total_amount as u128).sum()
}

pub fn total_withdrawn(records: &[StreamRecord]) -> u128 {
    records.iter().map(|r| r.params.withdrawn_amount as u128).sum()
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UpcomingWithdrawal {
    pub stream_id: String,
    pub next_withdrawal: i64,
    /// Withdrawable amount at query time.
    pub amount: u64,
}

/// Automatic withdrawals scheduled strictly after `now`, soonest first.
pub fn upcoming_withdrawals(
    records: &[StreamRecord],
    now: i64,
    limit: usize,
) -> Vec<UpcomingWithdrawal> {
    let mut upcoming: Vec<UpcomingWithdrawal> = records
        .iter()
        .filter_map(|r| {
            let next = next_withdrawal_time_of(&r.params, now)?;
            (next > now).then(|| UpcomingWithdrawal {
                stream_id: r.id.clone(),
                next_withdrawal: next,
                amount: withdrawable_amount_of(&r.params, now),
            })
        })
        .collect();

    upcoming.sort_by_key(|u| u.next_withdrawal);
    upcoming.truncate(limit);
    upcoming
}

/// Aggregate view over a set of streams.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_streams: usize,
    pub scheduled_streams: usize,
    pub active_streams: usize,
    pub paused_streams: usize,
    pub completed_streams: usize,
    pub canceled_streams: usize,
    // u128 sums are serialized as strings to survive JSON consumers.
    #[serde(with = "u128_string")]
    pub total_value: u128,
    #[serde(with = "u128_string")]
    pub total_streamed: u128,
    #[serde(with = "u128_string")]
    pub total_withdrawn: u128,
    /// Mean nominal duration in seconds; zero for an empty set.
    pub average_duration: i64,
}

pub fn summarize(records: &[StreamRecord], now: i64) -> PortfolioSummary {
    let mut summary = PortfolioSummary {
        total_streams: records.len(),
        total_value: total_value(records),
        total_withdrawn: total_withdrawn(records),
        ..Default::default()
    };

    let mut duration_sum: i128 = 0;
    for record in records {
        let metrics = calculate_metrics(&record.params, now);
        summary.total_streamed += metrics.streamed_amount as u128;
        duration_sum += metrics.total_duration as i128;

        match metrics.status {
            StreamStatus::Scheduled => summary.scheduled_streams += 1,
            StreamStatus::Active => summary.active_streams += 1,
            StreamStatus::Paused => summary.paused_streams += 1,
            StreamStatus::Completed => summary.completed_streams += 1,
            StreamStatus::Canceled => summary.canceled_streams += 1,
        }
    }

    if !records.is_empty() {
        summary.average_duration = (duration_sum / records.len() as i128) as i64;
    }

    summary
}

// ─────────────────────────────────────────────────────────
// Wallet view
// ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WalletTotals {
    pub outgoing: usize,
    pub incoming: usize,
    #[serde(with = "u128_string")]
    pub total_value: u128,
    pub active_streams: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WalletStreams<T> {
    pub outgoing: Vec<T>,
    pub incoming: Vec<T>,
    pub total: WalletTotals,
}

impl<T> WalletStreams<T> {
    /// Convert both lists, keeping the totals.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> WalletStreams<U> {
        WalletStreams {
            outgoing: self.outgoing.into_iter().map(&mut f).collect(),
            incoming: self.incoming.into_iter().map(&mut f).collect(),
            total: self.total,
        }
    }
}

/// Splits the streams a wallet takes part in into those it sends and those
/// it receives, newest first. A self-stream appears in both lists and is
/// counted once in the totals.
pub fn split_by_wallet(
    records: &[StreamRecord],
    wallet: &str,
    now: i64,
) -> WalletStreams<StreamRecord> {
    let mut outgoing: Vec<StreamRecord> = records
        .iter()
        .filter(|r| r.sender == wallet)
        .cloned()
        .collect();
    let mut incoming: Vec<StreamRecord> = records
        .iter()
        .filter(|r| r.recipient == wallet)
        .cloned()
        .collect();

    outgoing.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    incoming.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let involved: Vec<&StreamRecord> = records
        .iter()
        .filter(|r| r.sender == wallet || r.recipient == wallet)
        .collect();

    let total = WalletTotals {
        outgoing: outgoing.len(),
        incoming: incoming.len(),
        total_value: involved.iter().map(|r| r.params.total_amount as u128).sum(),
        active_streams: involved
            .iter()
            .filter(|r| status_of(&r.params, now) == StreamStatus::Active)
            .count(),
    };

    WalletStreams {
        outgoing,
        incoming,
        total,
    }
}

mod u128_string {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }
}
