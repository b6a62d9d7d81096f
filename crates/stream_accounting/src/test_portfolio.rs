use crate::portfolio::{
    can_cancel, can_transfer, can_update, filter_by_status, sort_by_status, split_by_wallet,
    summarize, total_value, total_withdrawn, upcoming_withdrawals,
};
use crate::{StreamParameters, StreamPermissions, StreamRecord, StreamStatus};

const ALICE: &str = "AL1CEsender1111111111111111111111111111111";
const BOB: &str = "B0Brecipient111111111111111111111111111111";
const CAROL: &str = "CAR0Lthirdparty11111111111111111111111111";

fn record(id: &str, start: i64, end: i64) -> StreamRecord {
    StreamRecord {
        id: id.to_string(),
        sender: ALICE.to_string(),
        recipient: BOB.to_string(),
        mint: "So11111111111111111111111111111111111111112".to_string(),
        name: format!("stream {id}"),
        created_at: start,
        permissions: StreamPermissions::default(),
        params: StreamParameters::linear(1_000, start, end, None).unwrap(),
    }
}

/// One stream in every status at `now = 500`.
fn mixed_records() -> Vec<StreamRecord> {
    let active = record("active", 0, 1_000);
    let scheduled = record("scheduled", 600, 1_600);
    let completed = record("completed", 0, 400);

    let mut paused = record("paused", 100, 1_100);
    paused.params.paused = true;
    paused.params.paused_at = Some(300);

    let mut canceled = record("canceled", 50, 1_050);
    canceled.params.canceled = true;
    canceled.params.withdrawn_amount = 100;

    vec![canceled, completed, paused, scheduled, active]
}

// ─────────────────────────────────────────────────────────
// Permissions
// ─────────────────────────────────────────────────────────

#[test]
fn test_cancel_permission_follows_role_flags() {
    let mut r = record("s", 0, 1_000);
    assert!(!can_cancel(&r, ALICE));
    assert!(!can_cancel(&r, BOB));

    r.permissions.cancelable_by_sender = true;
    assert!(can_cancel(&r, ALICE));
    assert!(!can_cancel(&r, BOB));
    assert!(!can_cancel(&r, CAROL));

    r.permissions.cancelable_by_recipient = true;
    assert!(can_cancel(&r, BOB));

    r.params.canceled = true;
    assert!(!can_cancel(&r, ALICE));
    assert!(!can_cancel(&r, BOB));
}

#[test]
fn test_transfer_and_update_permissions() {
    let mut r = record("s", 0, 1_000);
    r.permissions.transferable_by_recipient = true;

    assert!(can_transfer(&r, BOB));
    assert!(!can_transfer(&r, ALICE));
    assert!(can_update(&r, ALICE));
    assert!(!can_update(&r, BOB));

    r.params.canceled = true;
    assert!(!can_transfer(&r, BOB));
    assert!(!can_update(&r, ALICE));
}

// ─────────────────────────────────────────────────────────
// Ordering, filtering, totals
// ─────────────────────────────────────────────────────────

#[test]
fn test_sort_by_status_priority() {
    let mut records = mixed_records();
    sort_by_status(&mut records, 500);

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["active", "scheduled", "paused", "completed", "canceled"]);
}

#[test]
fn test_sort_ties_newest_start_first() {
    let mut records = vec![
        record("old", 0, 1_000),
        record("new", 200, 1_000),
        record("mid", 100, 1_000),
    ];
    sort_by_status(&mut records, 500);

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["new", "mid", "old"]);
}

#[test]
fn test_filter_by_status() {
    let records = mixed_records();

    let paused = filter_by_status(&records, StreamStatus::Paused, 500);
    assert_eq!(paused.len(), 1);
    assert_eq!(paused[0].id, "paused");

    assert!(filter_by_status(&records, StreamStatus::Active, 5_000).is_empty());
}

#[test]
fn test_totals() {
    let records = mixed_records();
    assert_eq!(total_value(&records), 5_000);
    assert_eq!(total_withdrawn(&records), 100);

    let huge: Vec<StreamRecord> = (0..3)
        .map(|i| {
            let mut r = record(&i.to_string(), 0, 10);
            r.params.total_amount = u64::MAX;
            r
        })
        .collect();
    assert_eq!(total_value(&huge), u64::MAX as u128 * 3);
}

#[test]
fn test_summary_counts_every_status() {
    let summary = summarize(&mixed_records(), 500);

    assert_eq!(summary.total_streams, 5);
    assert_eq!(summary.active_streams, 1);
    assert_eq!(summary.scheduled_streams, 1);
    assert_eq!(summary.paused_streams, 1);
    assert_eq!(summary.completed_streams, 1);
    assert_eq!(summary.canceled_streams, 1);
    assert_eq!(summary.total_value, 5_000);
    assert_eq!(summary.total_withdrawn, 100);
    // active 500 + completed 1000 + paused 200 + canceled 100 + scheduled 0
    assert_eq!(summary.total_streamed, 1_800);
    assert_eq!(summary.average_duration, (1_000 + 1_000 + 400 + 1_000 + 1_000) / 5);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["total_value"], "5000");
}

#[test]
fn test_summary_of_nothing() {
    let summary = summarize(&[], 500);
    assert_eq!(summary.total_streams, 0);
    assert_eq!(summary.average_duration, 0);
}

// ─────────────────────────────────────────────────────────
// Upcoming withdrawals
// ─────────────────────────────────────────────────────────

#[test]
fn test_upcoming_withdrawals_sorted_and_limited() {
    let mut records = Vec::new();
    for (i, last) in [300, 100, 200, 480].iter().enumerate() {
        let mut r = record(&format!("auto-{i}"), 0, 1_000);
        r.params.automatic_withdrawal = true;
        r.params.withdrawal_frequency = 100;
        r.params.last_withdrawal_time = *last;
        records.push(r);
    }
    // Manual streams never appear.
    records.push(record("manual", 0, 1_000));

    let upcoming = upcoming_withdrawals(&records, 250, 2);
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[0].stream_id, "auto-2");
    assert_eq!(upcoming[0].next_withdrawal, 300);
    assert_eq!(upcoming[0].amount, 250);
    assert_eq!(upcoming[1].stream_id, "auto-0");
    assert_eq!(upcoming[1].next_withdrawal, 400);

    // auto-1 is due at 200, which is already in the past.
    let all = upcoming_withdrawals(&records, 250, 10);
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|u| u.stream_id != "auto-1"));
}

// ─────────────────────────────────────────────────────────
// Wallet view
// ─────────────────────────────────────────────────────────

#[test]
fn test_split_by_wallet() {
    let mut records = mixed_records();
    let mut incoming_for_alice = record("to-alice", 300, 2_000);
    incoming_for_alice.sender = CAROL.to_string();
    incoming_for_alice.recipient = ALICE.to_string();
    records.push(incoming_for_alice);

    let view = split_by_wallet(&records, ALICE, 500);
    assert_eq!(view.outgoing.len(), 5);
    assert_eq!(view.incoming.len(), 1);
    assert_eq!(view.incoming[0].id, "to-alice");
    assert_eq!(view.total.outgoing, 5);
    assert_eq!(view.total.incoming, 1);
    assert_eq!(view.total.total_value, 6_000);
    assert_eq!(view.total.active_streams, 2);

    // Newest first.
    let created: Vec<i64> = view.outgoing.iter().map(|r| r.created_at).collect();
    let mut sorted = created.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(created, sorted);

    let ids = view.map(|r| r.id);
    assert_eq!(ids.incoming, vec!["to-alice".to_string()]);

    let stranger = split_by_wallet(&records, CAROL, 500);
    assert_eq!(stranger.outgoing.len(), 1);
    assert!(stranger.incoming.is_empty());
}
