use crate::invariants::assert_all_invariants;
use crate::{
    calculate_metrics, is_withdrawable, status_of, streamed_amount_of, withdrawable_amount_of,
    StreamParameters, StreamStatus,
};

fn paused_at(at: i64) -> StreamParameters {
    let mut params = StreamParameters::linear(1_000, 0, 1_000, None).unwrap();
    params.paused = true;
    params.paused_at = Some(at);
    params
}

#[test]
fn test_pause_freezes_accrual() {
    let params = paused_at(400);

    assert_eq!(streamed_amount_of(&params, 450), 400);
    assert_eq!(streamed_amount_of(&params, 900), 400);
    assert_eq!(status_of(&params, 900), StreamStatus::Paused);
}

#[test]
fn test_pause_freeze_holds_past_end() {
    let params = paused_at(400);
    let frozen = streamed_amount_of(&params, 400);

    for now in (400..5_000).step_by(13) {
        assert_eq!(streamed_amount_of(&params, now), frozen, "now = {now}");
        assert_eq!(status_of(&params, now), StreamStatus::Paused);
    }
}

#[test]
fn test_paused_stream_is_not_withdrawable() {
    let params = paused_at(400);

    // The amount is reported, but a paused stream cannot be drawn from.
    assert_eq!(withdrawable_amount_of(&params, 600), 400);
    assert!(!is_withdrawable(&params, 600));
}

#[test]
fn test_pause_before_cliff_stays_at_zero() {
    let mut params = StreamParameters::linear(1_000, 0, 1_000, Some(300)).unwrap();
    params.paused = true;
    params.paused_at = Some(200);

    assert_eq!(streamed_amount_of(&params, 250), 0);
    assert_eq!(streamed_amount_of(&params, 800), 0);
}

#[test]
fn test_missing_pause_instant_uses_query_time() {
    let mut params = paused_at(0);
    params.paused_at = None;

    assert_eq!(streamed_amount_of(&params, 300), 300);
    assert_eq!(streamed_amount_of(&params, 600), 600);
}

#[test]
fn test_previous_pauses_stretch_the_remaining_stream() {
    // Resumed after 200 seconds of pause: 800 effective seconds remain for the
    // whole deposit, and the end time still releases everything.
    let mut params = StreamParameters::linear(1_000, 0, 1_000, None).unwrap();
    params.total_paused_time = 200;

    assert_eq!(streamed_amount_of(&params, 100), 0);
    assert_eq!(streamed_amount_of(&params, 200), 0);
    assert_eq!(streamed_amount_of(&params, 700), 625);
    assert_eq!(streamed_amount_of(&params, 999), 998);
    assert_eq!(streamed_amount_of(&params, 1_000), 1_000);

    let metrics = calculate_metrics(&params, 700);
    assert_eq!(metrics.time_elapsed, 500);
    assert_eq!(metrics.time_remaining, 300);
}

#[test]
fn test_paused_again_after_previous_pauses() {
    let mut params = StreamParameters::linear(1_000, 0, 1_000, None).unwrap();
    params.total_paused_time = 200;
    params.paused = true;
    params.paused_at = Some(600);

    // (600 - 200) / 800 of the deposit.
    assert_eq!(streamed_amount_of(&params, 650), 500);
    assert_eq!(streamed_amount_of(&params, 10_000), 500);
}

#[test]
fn test_fully_paused_history_is_fully_vested() {
    let mut params = StreamParameters::linear(1_000, 0, 1_000, None).unwrap();
    params.total_paused_time = 1_000;

    assert_eq!(streamed_amount_of(&params, 10), 1_000);
    let metrics = assert_all_invariants(&params, 10);
    assert_eq!(metrics.time_elapsed, 0);
    assert_eq!(metrics.time_remaining, 0);

    // Unvalidated input is still handled.
    params.total_paused_time = 5_000;
    assert_eq!(streamed_amount_of(&params, 10), 1_000);
    assert_all_invariants(&params, 10);
}

#[test]
fn test_pause_invariants_hold_everywhere() {
    let mut params = paused_at(333);
    params.withdrawn_amount = 100;
    params.total_paused_time = 50;

    for now in (-100..2_000).step_by(11) {
        assert_all_invariants(&params, now);
    }
}
