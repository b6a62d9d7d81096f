//! Math functions for computing streamed, withdrawable and remaining amounts
//! of linear streams.
//!
//! Every function here is total: any [`StreamParameters`] value, validated or
//! not, produces a defined result for any query time.

use crate::types::{StreamMetrics, StreamParameters, StreamStatus};

// ─────────────────────────────────────────────────────────
// Public functions
// ─────────────────────────────────────────────────────────

/// Classifies the stream at `now`. Flags take precedence over timing.
pub fn status_of(params: &StreamParameters, now: i64) -> StreamStatus {
    if params.canceled {
        return StreamStatus::Canceled;
    }

    if params.paused {
        return StreamStatus::Paused;
    }

    if now < params.start_time {
        return StreamStatus::Scheduled;
    }

    if now >= params.end_time {
        return StreamStatus::Completed;
    }

    StreamStatus::Active
}

/// Calculates the total amount streamed to the recipient at `now`.
pub fn streamed_amount_of(params: &StreamParameters, now: i64) -> u64 {
    // Cancellation freezes the stream at what was already withdrawn.
    if params.canceled {
        return params.withdrawn_amount.min(params.total_amount);
    }

    let reference = reference_time(params, now);

    // Before cliff: nothing unlocked
    if reference < params.effective_cliff() {
        return 0;
    }

    // After end: everything unlocked
    if reference >= params.end_time {
        return params.total_amount;
    }

    // A stream paused for its whole duration is treated as fully vested.
    let duration = params.effective_duration();
    if duration <= 0 {
        return params.total_amount;
    }

    let elapsed = effective_elapsed(params, reference);

    // The cast back to u64 is safe: elapsed never exceeds duration.
    (params.total_amount as u128 * elapsed as u128 / duration as u128) as u64
}

/// Calculates the amount the recipient can withdraw at `now`.
pub fn withdrawable_amount_of(params: &StreamParameters, now: i64) -> u64 {
    if params.canceled {
        return 0;
    }

    streamed_amount_of(params, now).saturating_sub(params.withdrawn_amount)
}

/// Calculates the amount not yet streamed at `now`.
pub fn remaining_amount_of(params: &StreamParameters, now: i64) -> u64 {
    params
        .total_amount
        .saturating_sub(streamed_amount_of(params, now))
}

/// Streamed share of the total, in percent.
pub fn progress_percentage_of(params: &StreamParameters, now: i64) -> f64 {
    percentage(streamed_amount_of(params, now), params.total_amount)
}

/// Projects the next automatic withdrawal for an active stream.
pub fn next_withdrawal_time_of(params: &StreamParameters, now: i64) -> Option<i64> {
    if !params.automatic_withdrawal || status_of(params, now) != StreamStatus::Active {
        return None;
    }

    let frequency = i64::try_from(params.withdrawal_frequency).unwrap_or(i64::MAX);
    Some(params.last_withdrawal_time.saturating_add(frequency))
}

/// Whether the recipient could withdraw something right now.
pub fn is_withdrawable(params: &StreamParameters, now: i64) -> bool {
    !params.canceled && !params.paused && withdrawable_amount_of(params, now) > 0
}

/// Derives every metric for the stream at `now`.
pub fn calculate_metrics(params: &StreamParameters, now: i64) -> StreamMetrics {
    let status = status_of(params, now);
    let streamed_amount = streamed_amount_of(params, now);
    let withdrawable_amount = if params.canceled {
        0
    } else {
        streamed_amount.saturating_sub(params.withdrawn_amount)
    };

    let reference = reference_time(params, now);
    let time_elapsed = effective_elapsed(params, reference);
    let time_remaining = params.effective_duration().max(0) - time_elapsed;

    let total_duration = params.total_duration();
    let withdrawal_rate = if total_duration > 0 {
        params.total_amount / total_duration as u64
    } else {
        0
    };

    StreamMetrics {
        streamed_amount,
        withdrawable_amount,
        remaining_amount: params.total_amount.saturating_sub(streamed_amount),
        withdrawn_amount: params.withdrawn_amount,
        progress_percentage: percentage(streamed_amount, params.total_amount),
        withdrawn_percentage: percentage(params.withdrawn_amount, params.total_amount),
        time_elapsed,
        time_remaining,
        total_duration,
        withdrawal_rate,
        status,
        next_withdrawal_time: next_withdrawal_time_of(params, now),
    }
}

// ─────────────────────────────────────────────────────────
// Private helpers
// ─────────────────────────────────────────────────────────

/// While paused, accrual is measured at the pause instant.
fn reference_time(params: &StreamParameters, now: i64) -> i64 {
    if params.paused {
        params.paused_at.unwrap_or(now)
    } else {
        now
    }
}

/// Seconds streamed so far with previous pauses excluded, in
/// `[0, effective_duration]`.
fn effective_elapsed(params: &StreamParameters, reference: i64) -> i64 {
    let duration = params.effective_duration().max(0);

    reference
        .saturating_sub(params.start_time)
        .saturating_sub(params.total_paused_time)
        .clamp(0, duration)
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    (part as f64 * 100.0 / total as f64).clamp(0.0, 100.0)
}
