#![allow(dead_code)]

use crate::math::calculate_metrics;
use crate::types::{StreamMetrics, StreamParameters, StreamStatus};

/// INV-1: streamed + remaining always equals the deposit.
pub fn assert_conservation(params: &StreamParameters, metrics: &StreamMetrics) {
    assert_eq!(
        metrics.streamed_amount as u128 + metrics.remaining_amount as u128,
        params.total_amount as u128,
        "INV-1 violated: streamed {} + remaining {} != total {}",
        metrics.streamed_amount,
        metrics.remaining_amount,
        params.total_amount
    );
}

/// INV-2: on a live stream, withdrawable is exactly what streamed beyond
/// what was withdrawn.
pub fn assert_withdrawable_split(params: &StreamParameters, metrics: &StreamMetrics) {
    if params.canceled {
        assert_eq!(
            metrics.withdrawable_amount, 0,
            "INV-2 violated: canceled stream reports withdrawable {}",
            metrics.withdrawable_amount
        );
        return;
    }

    if params.withdrawn_amount <= metrics.streamed_amount {
        assert_eq!(
            metrics.streamed_amount,
            metrics.withdrawable_amount + params.withdrawn_amount,
            "INV-2 violated: streamed {} != withdrawable {} + withdrawn {}",
            metrics.streamed_amount,
            metrics.withdrawable_amount,
            params.withdrawn_amount
        );
    } else {
        assert_eq!(metrics.withdrawable_amount, 0);
    }
}

/// INV-3: percentages stay within [0, 100].
pub fn assert_percentages_bounded(metrics: &StreamMetrics) {
    assert!(
        (0.0..=100.0).contains(&metrics.progress_percentage),
        "INV-3 violated: progress {}",
        metrics.progress_percentage
    );
    assert!(
        (0.0..=100.0).contains(&metrics.withdrawn_percentage),
        "INV-3 violated: withdrawn percentage {}",
        metrics.withdrawn_percentage
    );
}

/// INV-4: streamed never exceeds the deposit.
pub fn assert_streamed_bounded(params: &StreamParameters, metrics: &StreamMetrics) {
    assert!(
        metrics.streamed_amount <= params.total_amount,
        "INV-4 violated: streamed {} > total {}",
        metrics.streamed_amount,
        params.total_amount
    );
}

/// INV-5: a projection only exists for active automatic streams.
pub fn assert_projection_consistent(params: &StreamParameters, metrics: &StreamMetrics) {
    if metrics.next_withdrawal_time.is_some() {
        assert!(params.automatic_withdrawal, "INV-5 violated: manual stream projected");
        assert_eq!(
            metrics.status,
            StreamStatus::Active,
            "INV-5 violated: projection on {:?} stream",
            metrics.status
        );
    }
}

/// Run all stateless invariants at `now` and hand back the metrics.
pub fn assert_all_invariants(params: &StreamParameters, now: i64) -> StreamMetrics {
    let metrics = calculate_metrics(params, now);
    assert_conservation(params, &metrics);
    assert_withdrawable_split(params, &metrics);
    assert_percentages_bounded(&metrics);
    assert_streamed_bounded(params, &metrics);
    assert_projection_consistent(params, &metrics);
    metrics
}
